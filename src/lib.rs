// Spendbook - Personal finance tracker core
// Exposes all modules for use in the CLI, the API server, and tests

pub mod analytics;
pub mod categories;
pub mod db;
pub mod engine;
pub mod forms;
pub mod ingest;
pub mod merge;
pub mod rule;
pub mod rule_store;

#[cfg(feature = "client")]
pub mod client;

// Re-export commonly used types
pub use analytics::{monthly_trend, summarize, MonthlyTotals, Summary};
pub use categories::{is_known_category, CATEGORIES, FALLBACK_CATEGORY};
pub use db::{
    compute_transaction_hash, count_transactions, get_all_transactions, insert_transactions,
    query_transactions, recategorize_all, setup_database, update_transaction_category,
    PagedTransactions, Transaction, TransactionQuery, TxType,
};
pub use engine::{Classification, RuleEngine};
pub use forms::{AddRuleForm, SubmitBlocked, SubmitRequest};
pub use ingest::{
    ingest_statement, BankCsvParser, CreditCardCsvParser, StatementParser, UploadOutcome,
};
pub use merge::{normalize_condition, pattern_alternatives, plan, MergeError, MergePlan};
pub use rule::{ImportResult, Rule, RuleDraft, RuleExport};
pub use rule_store::{
    create_rule, delete_rule, export_rules, find_by_rule_name, get_rule, import_rules, list_rules,
    seed_default_rules, update_rule,
};

#[cfg(feature = "client")]
pub use client::{ApiClient, ClientError, MergeApplied};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
