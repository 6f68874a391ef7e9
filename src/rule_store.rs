// 🗃️ Rule Store - CRUD, export and import for categorization rules
// Rules live in the rule_definition table; rule_name is unique

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::categories;
use crate::rule::{ImportResult, Rule, RuleDraft, RuleExport};

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<Rule> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Rule {
        id: row.get("id")?,
        rule_name: row.get("rule_name")?,
        category_name: row.get("category_name")?,
        pattern: row.get("pattern")?,
        priority: row.get("priority")?,
        enabled: row.get("enabled")?,
        include_in_totals: row.get("include_in_totals")?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// All rules in insertion (id) order. The merge planner depends on this
/// order: the first enabled rule per category is the merge target.
pub fn list_rules(conn: &Connection) -> Result<Vec<Rule>> {
    let mut stmt = conn.prepare("SELECT * FROM rule_definition ORDER BY id ASC")?;
    let rows = stmt.query_map([], row_to_rule)?;
    let rules: std::result::Result<Vec<_>, _> = rows.collect();
    rules.context("Failed to read rules")
}

pub fn get_rule(conn: &Connection, id: i64) -> Result<Option<Rule>> {
    let rule = conn
        .query_row(
            "SELECT * FROM rule_definition WHERE id = ?1",
            params![id],
            row_to_rule,
        )
        .optional()?;
    Ok(rule)
}

pub fn find_by_rule_name(conn: &Connection, rule_name: &str) -> Result<Option<Rule>> {
    let rule = conn
        .query_row(
            "SELECT * FROM rule_definition WHERE rule_name = ?1",
            params![rule_name],
            row_to_rule,
        )
        .optional()?;
    Ok(rule)
}

/// Persist a draft; returns the stored rule with its assigned id
pub fn create_rule(conn: &Connection, draft: &RuleDraft) -> Result<Rule> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO rule_definition (
            rule_name, category_name, pattern, priority, enabled,
            include_in_totals, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            draft.rule_name,
            draft.category_name,
            draft.pattern,
            draft.priority,
            draft.enabled,
            draft.include_in_totals,
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to create rule '{}'", draft.rule_name))?;

    let id = conn.last_insert_rowid();
    Ok(Rule {
        id,
        rule_name: draft.rule_name.clone(),
        category_name: draft.category_name.clone(),
        pattern: draft.pattern.clone(),
        priority: draft.priority,
        enabled: draft.enabled,
        include_in_totals: draft.include_in_totals,
        created_at: Some(now),
        updated_at: Some(now),
    })
}

/// Overwrite every mutable field of the rule `id`; errors when it does
/// not exist. `created_at` is preserved, `updated_at` is stamped.
pub fn update_rule(conn: &Connection, id: i64, rule: &Rule) -> Result<Rule> {
    let now = Utc::now();
    let changed = conn.execute(
        "UPDATE rule_definition SET
            rule_name = ?1, category_name = ?2, pattern = ?3, priority = ?4,
            enabled = ?5, include_in_totals = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            rule.rule_name,
            rule.category_name,
            rule.pattern,
            rule.priority,
            rule.enabled,
            rule.include_in_totals,
            now.to_rfc3339(),
            id,
        ],
    )?;

    if changed == 0 {
        return Err(anyhow!("Rule not found: {}", id));
    }

    get_rule(conn, id)?.ok_or_else(|| anyhow!("Rule not found: {}", id))
}

pub fn delete_rule(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM rule_definition WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(anyhow!("Rule not found: {}", id));
    }
    Ok(())
}

/// All rules stripped of ids and timestamps, for backup/transfer
pub fn export_rules(conn: &Connection) -> Result<Vec<RuleExport>> {
    Ok(list_rules(conn)?.iter().map(RuleExport::from).collect())
}

/// Bulk import keyed on the unique rule name.
///
/// An incoming name that already exists is either skipped
/// (`skip_duplicates`) or updated in place; new names are created.
/// Per-rule failures are counted and the first few named in the message.
pub fn import_rules(
    conn: &Connection,
    rules: &[RuleExport],
    skip_duplicates: bool,
) -> Result<ImportResult> {
    let mut success_count = 0;
    let mut skipped_count = 0;
    let mut error_count = 0;
    let mut errors: Vec<String> = Vec::new();

    for export in rules {
        let outcome = import_one(conn, export, skip_duplicates);
        match outcome {
            Ok(true) => success_count += 1,
            Ok(false) => skipped_count += 1,
            Err(e) => {
                error_count += 1;
                errors.push(format!("{}: {}", export.rule_name, e));
            }
        }
    }

    let mut message = format!(
        "Import completed: {} imported, {} skipped, {} errors",
        success_count, skipped_count, error_count
    );
    if !errors.is_empty() && errors.len() <= 5 {
        message.push_str(". Errors: ");
        message.push_str(&errors.join("; "));
    }

    Ok(ImportResult {
        success_count,
        skipped_count,
        error_count,
        message,
    })
}

/// Ok(true) = imported, Ok(false) = skipped
fn import_one(conn: &Connection, export: &RuleExport, skip_duplicates: bool) -> Result<bool> {
    match find_by_rule_name(conn, &export.rule_name)? {
        Some(existing) => {
            if skip_duplicates {
                return Ok(false);
            }
            let draft = export.clone().into_draft();
            let updated = Rule {
                id: existing.id,
                rule_name: draft.rule_name,
                category_name: draft.category_name,
                pattern: draft.pattern,
                priority: draft.priority,
                enabled: draft.enabled,
                include_in_totals: draft.include_in_totals,
                created_at: existing.created_at,
                updated_at: existing.updated_at,
            };
            update_rule(conn, existing.id, &updated)?;
            Ok(true)
        }
        None => {
            create_rule(conn, &export.clone().into_draft())?;
            Ok(true)
        }
    }
}

/// Install the default keyword rules, skipping names that already exist.
/// Returns how many were created.
pub fn seed_default_rules(conn: &Connection) -> Result<usize> {
    let mut created = 0;
    for draft in categories::default_rules() {
        if find_by_rule_name(conn, &draft.rule_name)?.is_none() {
            create_rule(conn, &draft)?;
            created += 1;
        }
    }
    Ok(created)
}

// ============================================================================
// TESTS
// ============================================================================
