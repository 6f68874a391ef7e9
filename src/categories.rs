// 🗂️ Category Set - The fixed category enumeration + default keyword rules
// Categories are display names; rules reference them by exact string

use crate::rule::RuleDraft;

/// Every category the tracker knows about. Rule forms offer exactly this
/// list; the merge planner trusts its caller to have validated membership.
pub const CATEGORIES: [&str; 25] = [
    "Income",
    "Food & Dining",
    "Groceries",
    "Shopping",
    "Travel",
    "Bills & Utilities",
    "Medical & Health",
    "Personal Care",
    "Subscriptions",
    "Loans & EMIs",
    "Transfers",
    "Fees & Charges",
    "Donations",
    "Business",
    "Fuel",
    "Medical",
    "Housing / Rent",
    "Entertainment",
    "Insurance",
    "Investment",
    "Education",
    "Pets",
    "Vehicle/Transportation",
    "Credit Card Payment",
    "Miscellaneous",
];

/// Category assigned when no rule matches a description
pub const FALLBACK_CATEGORY: &str = "Miscellaneous";

/// Transactions in this category are bank-side payments toward a credit
/// card bill; they are kept out of totals to avoid double counting
pub const CREDIT_CARD_PAYMENT: &str = "Credit Card Payment";

/// Exact-match membership test against the fixed set
pub fn is_known_category(name: &str) -> bool {
    CATEGORIES.contains(&name)
}

// ============================================================================
// DEFAULT KEYWORD RULES
// ============================================================================

/// Seed keywords per category. Each entry becomes one enabled rule whose
/// pattern is the parenthesized alternation of its keywords, the same shape
/// the merge planner appends to later.
const DEFAULT_KEYWORDS: [(&str, &[&str]); 13] = [
    (
        "Food & Dining",
        &[
            "swiggy", "zomato", "dominos", "kfc", "pizza hut", "mcdonald", "burger king",
            "subway", "starbucks", "cafe", "restaurant", "dining", "eatery", "biryani",
        ],
    ),
    (
        "Groceries",
        &[
            "dmart", "bigbasket", "reliance fresh", "supermarket", "grocery", "blinkit",
            "instamart", "zepto", "dunzo",
        ],
    ),
    (
        "Shopping",
        &[
            "amazon", "flipkart", "myntra", "ajio", "meesho", "snapdeal", "nykaa", "mall",
            "retail", "apparel",
        ],
    ),
    (
        "Travel",
        &[
            "uber", "ola", "rapido", "irctc", "makemytrip", "goibibo", "redbus", "yatra",
            "cleartrip", "flight", "hotel", "taxi", "airport",
        ],
    ),
    (
        "Income",
        &[
            "salary", "neft cr", "imps cr", "ach cr", "rtgs cr", "refund", "cashback",
            "interest", "dividend", "bonus", "payment received",
        ],
    ),
    (
        "Bills & Utilities",
        &[
            "electricity", "water bill", "gas bill", "postpaid", "prepaid", "recharge",
            "broadband", "wifi", "bill payment", "airtel", "jio", "vodafone",
        ],
    ),
    (
        "Fuel",
        &[
            "petrol", "diesel", "fuel", "hpcl", "bpcl", "iocl", "shell", "gas station",
            "cng", "petroleum",
        ],
    ),
    (
        "Medical & Health",
        &[
            "hospital", "pharmacy", "apollo", "medplus", "clinic", "doctor", "medicine",
            "diagnostic", "pharma", "healthcare",
        ],
    ),
    ("Housing / Rent", &["rent", "lease", "apartment", "flat rent", "house rent"]),
    (
        "Entertainment",
        &[
            "netflix", "hotstar", "prime video", "sony liv", "zee5", "disney", "spotify",
            "cinema", "pvr", "inox", "gaming",
        ],
    ),
    (
        "Insurance",
        &["insurance", "lic", "policy", "premium", "health insurance", "life insurance"],
    ),
    (
        "Investment",
        &["mutual fund", "sip", "equity", "zerodha", "groww", "upstox", "trading", "shares"],
    ),
    (
        "Education",
        &["school", "college", "university", "tuition", "udemy", "coursera", "course fee"],
    ),
];

/// Build the seed rules installed on a fresh database
pub fn default_rules() -> Vec<RuleDraft> {
    DEFAULT_KEYWORDS
        .iter()
        .map(|(category, keywords)| RuleDraft {
            rule_name: format!("{}_Default", category.replace(|c: char| !c.is_ascii_alphanumeric(), "_")),
            category_name: (*category).to_string(),
            pattern: format!("({})", keywords.join("|")),
            priority: 0,
            enabled: true,
            include_in_totals: true,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::pattern_alternatives;

    #[test]
    fn test_known_categories() {
        assert!(is_known_category("Food & Dining"));
        assert!(is_known_category("Miscellaneous"));
        assert!(!is_known_category("food & dining")); // exact match only
        assert!(!is_known_category("Unknown"));
    }

    #[test]
    fn test_fallback_is_known() {
        assert!(is_known_category(FALLBACK_CATEGORY));
    }

    #[test]
    fn test_default_rules_reference_known_categories() {
        for draft in default_rules() {
            assert!(
                is_known_category(&draft.category_name),
                "seed rule for unknown category {}",
                draft.category_name
            );
            assert!(draft.enabled);
        }
    }

    #[test]
    fn test_default_rule_patterns_parse_as_alternations() {
        let rules = default_rules();
        assert!(!rules.is_empty());

        let food = rules
            .iter()
            .find(|r| r.category_name == "Food & Dining")
            .unwrap();
        assert_eq!(food.rule_name, "Food___Dining_Default");

        let alternatives = pattern_alternatives(&food.pattern);
        assert!(alternatives.contains(&"swiggy".to_string()));
        assert!(alternatives.contains(&"zomato".to_string()));
        // no stray parens survive the strip
        assert!(alternatives.iter().all(|a| !a.contains('(') && !a.contains(')')));
    }

    #[test]
    fn test_default_rule_names_unique() {
        let rules = default_rules();
        let mut names: Vec<&str> = rules.iter().map(|r| r.rule_name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), rules.len());
    }
}
