// 🧩 Rule Merger - Decide whether a new condition creates or extends a rule
// Pure computation; callers persist the outcome and surface the errors

use chrono::Utc;
use thiserror::Error;

use crate::rule::{Rule, RuleDraft};

/// Priority given to rules the planner creates
const AUTO_RULE_PRIORITY: i32 = 10;

/// Why a merge request was refused. Both cases are user-correctable and
/// must be surfaced inline; neither implies any mutation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("a category and a non-empty condition are required")]
    EmptyInput,

    #[error("this condition already exists in the rule")]
    DuplicateCondition,
}

/// What the caller must persist
#[derive(Debug, Clone, PartialEq)]
pub enum MergePlan {
    /// No enabled rule for the category exists; create this one
    Create(RuleDraft),

    /// Extend the enabled rule `rule_id`; `rule` is the full record with
    /// only the pattern replaced
    Update { rule_id: i64, rule: Rule },
}

/// Turn a raw transaction description into a clean matching token:
/// lower-cased, everything outside `[a-z0-9\s]` dropped, then trimmed.
/// Total function; empty input yields an empty string.
pub fn normalize_condition(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Decompose a pattern into its ordered alternatives.
///
/// The outer parentheses are stripped textually, one character off each
/// end, only when the trimmed pattern both starts with `(` and ends with
/// `)`. Nested groups are NOT handled: `(a|(b))` mis-parses. That matches
/// the deployed behavior and all patterns the tracker itself writes are
/// flat alternations, so it stays as-is.
///
/// Order and duplicates are preserved; membership checks are the caller's.
pub fn pattern_alternatives(pattern: &str) -> Vec<String> {
    let trimmed = pattern.trim();
    let inner = if trimmed.starts_with('(') && trimmed.ends_with(')') && trimmed.len() >= 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    inner.split('|').map(|part| part.trim().to_string()).collect()
}

/// Name for an auto-created rule: the category with every character
/// outside `[A-Za-z0-9]` replaced by `_`, then `_AutoRule_<epoch millis>`
pub fn auto_rule_name(category: &str, stamp_millis: i64) -> String {
    let sanitized: String = category
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_AutoRule_{}", sanitized, stamp_millis)
}

/// Plan how a new condition joins the rule set for `category`.
///
/// The rule slice is a read-only snapshot; nothing is mutated. On success
/// the caller persists the returned plan through the rule storage API.
pub fn plan(category: &str, condition: &str, existing: &[Rule]) -> Result<MergePlan, MergeError> {
    plan_at(category, condition, existing, Utc::now().timestamp_millis())
}

/// Same as [`plan`], with the auto-rule timestamp injected for determinism
pub fn plan_at(
    category: &str,
    condition: &str,
    existing: &[Rule],
    stamp_millis: i64,
) -> Result<MergePlan, MergeError> {
    let condition = condition.trim();
    if category.is_empty() || condition.is_empty() {
        return Err(MergeError::EmptyInput);
    }

    // First enabled rule for the category, in received order, is the target
    let target = existing
        .iter()
        .find(|rule| rule.category_name == category && rule.enabled);

    let Some(target) = target else {
        return Ok(MergePlan::Create(RuleDraft {
            rule_name: auto_rule_name(category, stamp_millis),
            category_name: category.to_string(),
            pattern: condition.to_string(),
            priority: AUTO_RULE_PRIORITY,
            enabled: true,
            include_in_totals: true,
        }));
    };

    let existing_pattern = target.pattern.trim();
    if pattern_alternatives(existing_pattern)
        .iter()
        .any(|alternative| alternative == condition)
    {
        return Err(MergeError::DuplicateCondition);
    }

    let new_pattern = merged_pattern(existing_pattern, condition);
    Ok(MergePlan::Update {
        rule_id: target.id,
        rule: target.with_pattern(new_pattern),
    })
}

/// Append a condition as a new alternative, preserving existing ones
fn merged_pattern(existing: &str, condition: &str) -> String {
    if existing.starts_with('(') && existing.ends_with(')') && existing.len() >= 2 {
        // Reopen the group: drop the final ')' and close after the new term
        format!("{}|{})", &existing[..existing.len() - 1], condition)
    } else {
        // Bare term or unwrapped alternation: wrap the whole thing
        format!("({}|{})", existing, condition)
    }
}

// ============================================================================
// TESTS
// ============================================================================
