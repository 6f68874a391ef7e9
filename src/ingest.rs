// 🏗️ Statement Ingest - CSV statement parsing and import
// One parser per statement flavor; the pipeline classifies, hashes, inserts

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::categories;
use crate::db::{self, Transaction, TxType};
use crate::engine::RuleEngine;

/// One statement line after parsing, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub date: NaiveDate,
    pub description: String,
    pub ref_no: Option<String>,
    pub amount: f64,
    pub tx_type: TxType,
    pub balance: Option<f64>,
}

/// Parser output: good rows plus a count of lines that failed to parse
#[derive(Debug, Clone, Default)]
pub struct ParsedStatement {
    pub rows: Vec<ParsedRow>,
    pub errors: usize,
}

/// StatementParser - one implementation per statement flavor.
/// A malformed line is counted, not fatal; only an unreadable file errors.
pub trait StatementParser {
    /// Human-readable name for display
    fn source_name(&self) -> &'static str;

    /// Whether rows from this source are credit-card transactions
    fn is_credit_card(&self) -> bool {
        false
    }

    fn parse(&self, input: &str) -> Result<ParsedStatement>;
}

/// Result of an ingest run, shaped for the upload response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub rows_processed: usize,
    pub rows_saved: usize,
    pub errors: usize,
    pub duplicates: usize,
    pub duplicate_transactions: Vec<String>,
}

/// Amounts come in as "1,250.00", "₹450" or plain numbers
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Statement dates show up in a handful of formats
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

// ============================================================================
// BANK STATEMENT CSV
// ============================================================================

/// Bank account statement: Date, Description, Ref No, Type, Amount, Balance
pub struct BankCsvParser;

#[derive(Debug, Deserialize)]
struct BankCsvRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Ref No", default)]
    ref_no: Option<String>,
    #[serde(rename = "Type")]
    tx_type: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Balance", default)]
    balance: Option<String>,
}

impl StatementParser for BankCsvParser {
    fn source_name(&self) -> &'static str {
        "Bank Statement"
    }

    fn parse(&self, input: &str) -> Result<ParsedStatement> {
        let mut reader = csv::Reader::from_reader(input.as_bytes());
        let mut parsed = ParsedStatement::default();

        for record in reader.deserialize::<BankCsvRecord>() {
            let Ok(record) = record else {
                parsed.errors += 1;
                continue;
            };

            let row = parse_date(&record.date).and_then(|date| {
                let tx_type = TxType::from_code(&record.tx_type)?;
                let amount = parse_amount(&record.amount)?;
                Some(ParsedRow {
                    date,
                    description: record.description.trim().to_string(),
                    ref_no: record.ref_no.as_deref().map(str::trim).filter(|r| !r.is_empty()).map(String::from),
                    amount: amount.abs(),
                    tx_type,
                    balance: record.balance.as_deref().and_then(parse_amount),
                })
            });

            match row {
                Some(row) if !row.description.is_empty() => parsed.rows.push(row),
                _ => parsed.errors += 1,
            }
        }

        Ok(parsed)
    }
}

// ============================================================================
// CREDIT CARD STATEMENT CSV
// ============================================================================

/// Credit-card statement: Date, Description, Amount.
/// Positive amounts are charges (debits), negative are refunds (credits).
pub struct CreditCardCsvParser;

#[derive(Debug, Deserialize)]
struct CreditCardCsvRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Amount")]
    amount: String,
}

impl StatementParser for CreditCardCsvParser {
    fn source_name(&self) -> &'static str {
        "Credit Card Statement"
    }

    fn is_credit_card(&self) -> bool {
        true
    }

    fn parse(&self, input: &str) -> Result<ParsedStatement> {
        let mut reader = csv::Reader::from_reader(input.as_bytes());
        let mut parsed = ParsedStatement::default();

        for record in reader.deserialize::<CreditCardCsvRecord>() {
            let Ok(record) = record else {
                parsed.errors += 1;
                continue;
            };

            let row = parse_date(&record.date).and_then(|date| {
                let amount = parse_amount(&record.amount)?;
                Some(ParsedRow {
                    date,
                    description: record.description.trim().to_string(),
                    ref_no: None,
                    amount: amount.abs(),
                    tx_type: if amount < 0.0 { TxType::Credit } else { TxType::Debit },
                    balance: None,
                })
            });

            match row {
                Some(row) if !row.description.is_empty() => parsed.rows.push(row),
                _ => parsed.errors += 1,
            }
        }

        Ok(parsed)
    }
}

// ============================================================================
// INGEST PIPELINE
// ============================================================================

/// Parse a statement, classify every row through the engine, and insert
/// with duplicate detection. Rows the engine cannot match fall back to
/// the default category.
pub fn ingest_statement(
    conn: &Connection,
    engine: &RuleEngine,
    parser: &dyn StatementParser,
    input: &str,
) -> Result<UploadOutcome> {
    let parsed = parser
        .parse(input)
        .with_context(|| format!("Failed to parse {}", parser.source_name()))?;

    let now = Utc::now();
    let transactions: Vec<Transaction> = parsed
        .rows
        .iter()
        .map(|row| {
            let (category, include_in_totals) = engine.categorize(&row.description);
            let is_cc_payment =
                !parser.is_credit_card() && category == categories::CREDIT_CARD_PAYMENT;

            Transaction {
                id: 0,
                date: row.date,
                description: row.description.clone(),
                ref_no: row.ref_no.clone(),
                amount: row.amount,
                tx_type: row.tx_type,
                balance: row.balance,
                category,
                transaction_hash: db::compute_transaction_hash(
                    row.date,
                    &row.description,
                    row.amount,
                    row.tx_type,
                    row.ref_no.as_deref(),
                ),
                is_credit_card_transaction: parser.is_credit_card(),
                is_credit_card_payment: is_cc_payment,
                include_in_totals: if is_cc_payment { false } else { include_in_totals },
                created_at: now,
            }
        })
        .collect();

    let report = db::insert_transactions(conn, &transactions)?;

    Ok(UploadOutcome {
        rows_processed: parsed.rows.len() + parsed.errors,
        rows_saved: report.saved,
        errors: parsed.errors,
        duplicates: report.duplicates,
        duplicate_transactions: report.duplicate_descriptions,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::rule::Rule;

    const BANK_CSV: &str = "\
Date,Description,Ref No,Type,Amount,Balance
2025-01-03,UPI-SWIGGY ORDER 4417,UPI9981,DEBIT,\"450.00\",\"12,550.00\"
2025-01-05,SALARY JAN,NEFT221,CREDIT,\"85,000.00\",\"97,550.00\"
05/01/2025,ATM WDL,ATM11,DR,2000,95550
";

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn food_rule() -> Rule {
        Rule {
            id: 1,
            rule_name: "food".to_string(),
            category_name: "Food & Dining".to_string(),
            pattern: "(swiggy|zomato)".to_string(),
            priority: 10,
            enabled: true,
            include_in_totals: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_bank_csv_parse() {
        let parsed = BankCsvParser.parse(BANK_CSV).unwrap();
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.errors, 0);

        let first = &parsed.rows[0];
        assert_eq!(first.description, "UPI-SWIGGY ORDER 4417");
        assert_eq!(first.ref_no.as_deref(), Some("UPI9981"));
        assert_eq!(first.amount, 450.0);
        assert_eq!(first.tx_type, TxType::Debit);
        assert_eq!(first.balance, Some(12550.0));

        // DR code and dd/mm/yyyy both accepted
        let third = &parsed.rows[2];
        assert_eq!(third.tx_type, TxType::Debit);
        assert_eq!(third.date, "2025-01-05".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_bank_csv_bad_rows_counted() {
        let csv = "\
Date,Description,Ref No,Type,Amount,Balance
not-a-date,THING,,DEBIT,10,
2025-01-03,GOOD ROW,,DEBIT,10,
2025-01-04,BAD TYPE,,WIRE,10,
";
        let parsed = BankCsvParser.parse(csv).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.errors, 2);
    }

    #[test]
    fn test_credit_card_sign_convention() {
        let csv = "\
Date,Description,Amount
2025-01-03,AMAZON.IN ORDER,1299.00
2025-01-08,REFUND AMAZON,-1299.00
";
        let parsed = CreditCardCsvParser.parse(csv).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].tx_type, TxType::Debit);
        assert_eq!(parsed.rows[1].tx_type, TxType::Credit);
        assert_eq!(parsed.rows[1].amount, 1299.0);
    }

    #[test]
    fn test_ingest_classifies_and_saves() {
        let conn = test_conn();
        let engine = RuleEngine::from_rules(&[food_rule()]).unwrap();

        let outcome = ingest_statement(&conn, &engine, &BankCsvParser, BANK_CSV).unwrap();
        assert_eq!(outcome.rows_processed, 3);
        assert_eq!(outcome.rows_saved, 3);
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.duplicates, 0);

        let all = db::get_all_transactions(&conn).unwrap();
        assert_eq!(all[0].category, "Food & Dining");
        assert_eq!(all[1].category, "Miscellaneous"); // no salary rule loaded
        assert!(!all[0].is_credit_card_transaction);
    }

    #[test]
    fn test_reupload_reports_all_duplicates() {
        let conn = test_conn();
        let engine = RuleEngine::new();

        ingest_statement(&conn, &engine, &BankCsvParser, BANK_CSV).unwrap();
        let second = ingest_statement(&conn, &engine, &BankCsvParser, BANK_CSV).unwrap();

        assert_eq!(second.rows_saved, 0);
        assert_eq!(second.duplicates, 3);
        assert_eq!(second.duplicate_transactions.len(), 3);
        assert_eq!(db::count_transactions(&conn).unwrap(), 3);
    }

    #[test]
    fn test_cc_payment_excluded_from_totals() {
        let conn = test_conn();
        let mut payment_rule = food_rule();
        payment_rule.rule_name = "ccpay".to_string();
        payment_rule.category_name = categories::CREDIT_CARD_PAYMENT.to_string();
        payment_rule.pattern = "cc payment".to_string();
        let engine = RuleEngine::from_rules(&[payment_rule]).unwrap();

        let csv = "\
Date,Description,Ref No,Type,Amount,Balance
2025-01-10,CC PAYMENT THANK YOU,,DEBIT,5000,
";
        ingest_statement(&conn, &engine, &BankCsvParser, csv).unwrap();

        let all = db::get_all_transactions(&conn).unwrap();
        assert!(all[0].is_credit_card_payment);
        assert!(!all[0].include_in_totals);
    }

    #[test]
    fn test_cc_statement_rows_flagged() {
        let conn = test_conn();
        let engine = RuleEngine::new();
        let csv = "\
Date,Description,Amount
2025-01-03,AMAZON.IN ORDER,1299.00
";
        ingest_statement(&conn, &engine, &CreditCardCsvParser, csv).unwrap();

        let all = db::get_all_transactions(&conn).unwrap();
        assert!(all[0].is_credit_card_transaction);
        assert!(!all[0].is_credit_card_payment);
    }
}
