// ⚙️ Rule Engine - Compile enabled rules and classify descriptions
// First match wins; higher priority rules are consulted first

use anyhow::{Context, Result};
use regex::Regex;

use crate::categories::FALLBACK_CATEGORY;
use crate::rule::Rule;

/// Result of matching a description against the compiled rule set
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: String,
    pub include_in_totals: bool,
    pub rule_name: String,
}

/// One enabled rule, pattern compiled
#[derive(Debug)]
struct CompiledRule {
    matcher: Regex,
    category: String,
    include_in_totals: bool,
    rule_name: String,
}

/// In-memory evaluator over the enabled rules.
///
/// Patterns match case-insensitively anywhere in the description, the
/// same contains semantics the stored `(?i).*pattern.*` constraints had.
/// Rebuilt from storage whenever rules change ("reload").
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Empty engine; classifies nothing
    pub fn new() -> Self {
        RuleEngine { rules: Vec::new() }
    }

    /// Compile the enabled subset, highest priority first. Ties keep the
    /// incoming (storage) order. A pattern that fails to compile fails
    /// the whole build, naming the offending rule.
    pub fn from_rules(rules: &[Rule]) -> Result<Self> {
        let mut enabled: Vec<&Rule> = rules.iter().filter(|rule| rule.enabled).collect();
        enabled.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut compiled = Vec::with_capacity(enabled.len());
        for rule in enabled {
            let matcher = Regex::new(&format!("(?i){}", rule.pattern))
                .with_context(|| format!("invalid pattern in rule '{}'", rule.rule_name))?;
            compiled.push(CompiledRule {
                matcher,
                category: rule.category_name.clone(),
                include_in_totals: rule.include_in_totals,
                rule_name: rule.rule_name.clone(),
            });
        }

        Ok(RuleEngine { rules: compiled })
    }

    /// First matching rule, or None when nothing matches
    pub fn classify(&self, description: &str) -> Option<Classification> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.is_match(description))
            .map(|rule| Classification {
                category: rule.category.clone(),
                include_in_totals: rule.include_in_totals,
                rule_name: rule.rule_name.clone(),
            })
    }

    /// Category + totals flag with the unmatched fallback applied
    pub fn categorize(&self, description: &str) -> (String, bool) {
        match self.classify(description) {
            Some(classification) => (classification.category, classification.include_in_totals),
            None => (FALLBACK_CATEGORY.to_string(), true),
        }
    }

    /// Number of compiled (enabled) rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i64, category: &str, pattern: &str, priority: i32, enabled: bool) -> Rule {
        Rule {
            id,
            rule_name: format!("rule_{}", id),
            category_name: category.to_string(),
            pattern: pattern.to_string(),
            priority,
            enabled,
            include_in_totals: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_contains_and_case_insensitive() {
        let engine = RuleEngine::from_rules(&[rule(1, "Food & Dining", "swiggy", 0, true)]).unwrap();

        assert!(engine.classify("UPI-SWIGGY ORDER 4417").is_some());
        assert!(engine.classify("swiggy").is_some());
        assert!(engine.classify("AMAZON PAY").is_none());
    }

    #[test]
    fn test_alternation_pattern_matches_any_branch() {
        let engine =
            RuleEngine::from_rules(&[rule(1, "Travel", "(uber|ola|rapido)", 0, true)]).unwrap();

        assert_eq!(engine.classify("OLA RIDE 2231").unwrap().category, "Travel");
        assert_eq!(engine.classify("uber trip").unwrap().category, "Travel");
        assert!(engine.classify("lyft").is_none());
    }

    #[test]
    fn test_priority_order_decides_overlap() {
        let engine = RuleEngine::from_rules(&[
            rule(1, "Shopping", "amazon", 1, true),
            rule(2, "Subscriptions", "amazon prime", 100, true),
        ])
        .unwrap();

        let hit = engine.classify("AMAZON PRIME MEMBERSHIP").unwrap();
        assert_eq!(hit.category, "Subscriptions");
        assert_eq!(hit.rule_name, "rule_2");

        // plain amazon still falls to the general rule
        assert_eq!(engine.classify("AMAZON.IN ORDER").unwrap().category, "Shopping");
    }

    #[test]
    fn test_equal_priority_keeps_storage_order() {
        let engine = RuleEngine::from_rules(&[
            rule(1, "Groceries", "market", 5, true),
            rule(2, "Shopping", "market", 5, true),
        ])
        .unwrap();

        assert_eq!(engine.classify("SUPER MARKET").unwrap().category, "Groceries");
    }

    #[test]
    fn test_disabled_rules_not_compiled() {
        let engine = RuleEngine::from_rules(&[
            rule(1, "Travel", "uber", 10, false),
            rule(2, "Food & Dining", "swiggy", 0, true),
        ])
        .unwrap();

        assert_eq!(engine.rule_count(), 1);
        assert!(engine.classify("UBER TRIP").is_none());
    }

    #[test]
    fn test_invalid_pattern_fails_build_with_rule_name() {
        let err = RuleEngine::from_rules(&[rule(7, "Fuel", "(hpcl", 0, true)]).unwrap_err();
        assert!(err.to_string().contains("rule_7"));
    }

    #[test]
    fn test_invalid_pattern_on_disabled_rule_is_ignored() {
        let engine = RuleEngine::from_rules(&[rule(7, "Fuel", "(hpcl", 0, false)]).unwrap();
        assert_eq!(engine.rule_count(), 0);
    }

    #[test]
    fn test_categorize_fallback() {
        let engine = RuleEngine::new();
        let (category, include) = engine.categorize("UNKNOWN MERCHANT");
        assert_eq!(category, "Miscellaneous");
        assert!(include);
    }

    #[test]
    fn test_include_in_totals_flows_through() {
        let mut excluded = rule(1, "Credit Card Payment", "cc payment", 50, true);
        excluded.include_in_totals = false;
        let engine = RuleEngine::from_rules(&[excluded]).unwrap();

        let (category, include) = engine.categorize("CC PAYMENT RECEIVED");
        assert_eq!(category, "Credit Card Payment");
        assert!(!include);
    }
}
