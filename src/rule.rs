// 🏷️ Rule Model - Categorization rule records
// Wire shapes shared by the store, the merge planner, and the REST surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted categorization rule.
///
/// `pattern` is a regex fragment holding one or more alternatives, either a
/// bare term (`swiggy`), a `|`-joined list, or a parenthesized group
/// (`(swiggy|zomato)`). Matching is case-insensitive and unanchored; the
/// evaluator applies that, not the pattern itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Backend-assigned identifier (SQLite rowid)
    pub id: i64,

    /// Display name, unique in storage. Auto-created rules are named
    /// `<category>_AutoRule_<epoch millis>`.
    pub rule_name: String,

    /// One value of the fixed category set
    pub category_name: String,

    /// Alternation pattern, see above
    pub pattern: String,

    /// Higher priority rules are evaluated first
    pub priority: i32,

    /// Only enabled rules are compiled and considered as merge targets
    pub enabled: bool,

    /// Whether matched transactions count toward dashboard totals
    pub include_in_totals: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rule {
    /// Copy of this rule with only the pattern replaced.
    /// Every other field, timestamps included, is carried over unchanged.
    pub fn with_pattern(&self, pattern: String) -> Rule {
        Rule {
            pattern,
            ..self.clone()
        }
    }
}

/// A rule without identity, as sent to `POST /api/rules`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    pub rule_name: String,
    pub category_name: String,
    pub pattern: String,
    pub priority: i32,
    pub enabled: bool,
    pub include_in_totals: bool,
}

/// Export/import shape: a rule stripped of id and timestamps.
///
/// Priority and flags are optional on import; absent values fall back to
/// the storage defaults (priority 0, enabled, counted in totals).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExport {
    pub rule_name: String,
    pub category_name: String,
    pub pattern: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub include_in_totals: Option<bool>,
}

impl From<&Rule> for RuleExport {
    fn from(rule: &Rule) -> Self {
        RuleExport {
            rule_name: rule.rule_name.clone(),
            category_name: rule.category_name.clone(),
            pattern: rule.pattern.clone(),
            priority: Some(rule.priority),
            enabled: Some(rule.enabled),
            include_in_totals: Some(rule.include_in_totals),
        }
    }
}

impl RuleExport {
    /// Resolve optional fields into a draft ready for storage
    pub fn into_draft(self) -> RuleDraft {
        RuleDraft {
            rule_name: self.rule_name,
            category_name: self.category_name,
            pattern: self.pattern,
            priority: self.priority.unwrap_or(0),
            enabled: self.enabled.unwrap_or(true),
            include_in_totals: self.include_in_totals.unwrap_or(true),
        }
    }
}

/// Outcome of a bulk rule import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub message: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_serializes_camel_case() {
        let rule = Rule {
            id: 7,
            rule_name: "Food_AutoRule_1700000000000".to_string(),
            category_name: "Food & Dining".to_string(),
            pattern: "(swiggy|zomato)".to_string(),
            priority: 10,
            enabled: true,
            include_in_totals: true,
            created_at: None,
            updated_at: None,
        };

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["ruleName"], "Food_AutoRule_1700000000000");
        assert_eq!(json["categoryName"], "Food & Dining");
        assert_eq!(json["includeInTotals"], true);
        // timestamps omitted when absent
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_with_pattern_replaces_only_pattern() {
        let rule = Rule {
            id: 3,
            rule_name: "Travel_Default".to_string(),
            category_name: "Travel".to_string(),
            pattern: "uber".to_string(),
            priority: 5,
            enabled: true,
            include_in_totals: false,
            created_at: None,
            updated_at: None,
        };

        let updated = rule.with_pattern("(uber|ola)".to_string());
        assert_eq!(updated.pattern, "(uber|ola)");
        assert_eq!(updated.id, rule.id);
        assert_eq!(updated.rule_name, rule.rule_name);
        assert_eq!(updated.priority, rule.priority);
        assert_eq!(updated.include_in_totals, rule.include_in_totals);
    }

    #[test]
    fn test_export_defaults_on_import() {
        let json = r#"{"ruleName":"r1","categoryName":"Fuel","pattern":"hpcl"}"#;
        let export: RuleExport = serde_json::from_str(json).unwrap();
        let draft = export.into_draft();

        assert_eq!(draft.priority, 0);
        assert!(draft.enabled);
        assert!(draft.include_in_totals);
    }
}
