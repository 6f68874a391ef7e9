// 💾 Transaction Store - SQLite persistence for statement transactions
// WAL-mode database, hash-based duplicate detection, paged queries

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::RuleEngine;

/// Direction of money movement, as the statements label it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    #[serde(rename = "DEBIT")]
    Debit,
    #[serde(rename = "CREDIT")]
    Credit,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Debit => "DEBIT",
            TxType::Credit => "CREDIT",
        }
    }

    /// Accepts the codes banks actually print: DEBIT/CREDIT and DR/CR
    pub fn from_code(code: &str) -> Option<TxType> {
        match code.trim().to_uppercase().as_str() {
            "DEBIT" | "DR" => Some(TxType::Debit),
            "CREDIT" | "CR" => Some(TxType::Credit),
            _ => None,
        }
    }
}

/// A stored statement transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub ref_no: Option<String>,
    pub amount: f64,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    /// Running balance where the statement provides one
    pub balance: Option<f64>,
    pub category: String,
    /// SHA-256 over the identifying fields; unique, drives duplicate
    /// detection on insert
    pub transaction_hash: String,
    pub is_credit_card_transaction: bool,
    pub is_credit_card_payment: bool,
    pub include_in_totals: bool,
    pub created_at: DateTime<Utc>,
}

/// Hash for duplicate detection. Identity is the rowid; this only decides
/// whether an incoming row was already ingested.
pub fn compute_transaction_hash(
    date: NaiveDate,
    description: &str,
    amount: f64,
    tx_type: TxType,
    ref_no: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}{}{}{}{}",
        date,
        description,
        amount,
        tx_type.as_str(),
        ref_no.unwrap_or("")
    ));
    format!("{:x}", hasher.finalize())
}

/// Filters and paging for the transaction list
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub page: u32,
    pub size: u32,
    pub search: Option<String>,
    pub category: Option<String>,
    pub tx_type: Option<TxType>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// One page of transactions, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedTransactions {
    pub content: Vec<Transaction>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub current_page: u32,
    pub page_size: u32,
}

/// Outcome of a batch insert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertReport {
    pub processed: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub duplicate_descriptions: Vec<String>,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            ref_no TEXT,
            amount REAL NOT NULL,
            tx_type TEXT NOT NULL,
            balance REAL,
            category TEXT NOT NULL,
            transaction_hash TEXT UNIQUE NOT NULL,
            is_credit_card_transaction INTEGER NOT NULL DEFAULT 0,
            is_credit_card_payment INTEGER NOT NULL DEFAULT 0,
            include_in_totals INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create transactions table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rule_definition (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rule_name TEXT UNIQUE NOT NULL,
            category_name TEXT NOT NULL,
            pattern TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            enabled INTEGER NOT NULL DEFAULT 1,
            include_in_totals INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create rule_definition table")?;

    Ok(())
}

/// Insert a batch, skipping rows whose hash is already stored.
/// Skipped rows are reported by description so uploads can list them.
pub fn insert_transactions(conn: &Connection, transactions: &[Transaction]) -> Result<InsertReport> {
    let mut report = InsertReport::default();

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO transactions (
            date, description, ref_no, amount, tx_type, balance, category,
            transaction_hash, is_credit_card_transaction, is_credit_card_payment,
            include_in_totals, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;

    for tx in transactions {
        report.processed += 1;
        let changed = stmt.execute(params![
            tx.date.to_string(),
            tx.description,
            tx.ref_no,
            tx.amount,
            tx.tx_type.as_str(),
            tx.balance,
            tx.category,
            tx.transaction_hash,
            tx.is_credit_card_transaction,
            tx.is_credit_card_payment,
            tx.include_in_totals,
            tx.created_at.to_rfc3339(),
        ])?;

        if changed == 1 {
            report.saved += 1;
        } else {
            report.duplicates += 1;
            report.duplicate_descriptions.push(tx.description.clone());
        }
    }

    Ok(report)
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let date: String = row.get("date")?;
    let tx_type: String = row.get("tx_type")?;
    let created_at: String = row.get("created_at")?;

    Ok(Transaction {
        id: row.get("id")?,
        date: date.parse().unwrap_or_default(),
        description: row.get("description")?,
        ref_no: row.get("ref_no")?,
        amount: row.get("amount")?,
        tx_type: TxType::from_code(&tx_type).unwrap_or(TxType::Debit),
        balance: row.get("balance")?,
        category: row.get("category")?,
        transaction_hash: row.get("transaction_hash")?,
        is_credit_card_transaction: row.get("is_credit_card_transaction")?,
        is_credit_card_payment: row.get("is_credit_card_payment")?,
        include_in_totals: row.get("include_in_totals")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default(),
    })
}

/// All transactions in chronological order (analytics input)
pub fn get_all_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare("SELECT * FROM transactions ORDER BY date ASC, id ASC")?;
    let rows = stmt.query_map([], row_to_transaction)?;
    let transactions: std::result::Result<Vec<_>, _> = rows.collect();
    transactions.context("Failed to read transactions")
}

/// Filtered, paged query; newest first
pub fn query_transactions(conn: &Connection, query: &TransactionQuery) -> Result<PagedTransactions> {
    let mut clauses: Vec<String> = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(search) = &query.search {
        clauses.push("description LIKE '%' || ? || '%'".to_string());
        args.push(Box::new(search.clone()));
    }
    if let Some(category) = &query.category {
        clauses.push("category = ?".to_string());
        args.push(Box::new(category.clone()));
    }
    if let Some(tx_type) = query.tx_type {
        clauses.push("tx_type = ?".to_string());
        args.push(Box::new(tx_type.as_str().to_string()));
    }
    if let Some(from) = query.from_date {
        clauses.push("date >= ?".to_string());
        args.push(Box::new(from.to_string()));
    }
    if let Some(to) = query.to_date {
        clauses.push("date <= ?".to_string());
        args.push(Box::new(to.to_string()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let total_elements: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM transactions{}", where_sql),
        params_from_iter(args.iter().map(|a| a.as_ref())),
        |row| row.get(0),
    )?;

    let size = query.size.max(1);
    let offset = i64::from(query.page) * i64::from(size);
    let sql = format!(
        "SELECT * FROM transactions{} ORDER BY date DESC, id DESC LIMIT {} OFFSET {}",
        where_sql, size, offset
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params_from_iter(args.iter().map(|a| a.as_ref())),
        row_to_transaction,
    )?;
    let content: std::result::Result<Vec<_>, _> = rows.collect();

    Ok(PagedTransactions {
        content: content.context("Failed to read transaction page")?,
        total_elements,
        total_pages: (total_elements + i64::from(size) - 1) / i64::from(size),
        current_page: query.page,
        page_size: size,
    })
}

/// Manual category override for a single transaction
pub fn update_transaction_category(conn: &Connection, id: i64, category: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE transactions SET category = ?1 WHERE id = ?2",
        params![category, id],
    )?;
    Ok(changed == 1)
}

/// Re-run the engine over every stored transaction. Returns how many rows
/// actually changed. Credit-card payments stay excluded from totals no
/// matter what rule matched them.
pub fn recategorize_all(conn: &Connection, engine: &RuleEngine) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT id, description, category, include_in_totals, is_credit_card_payment
         FROM transactions",
    )?;
    let rows: Vec<(i64, String, String, bool, bool)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<std::result::Result<_, _>>()?;

    let mut updated = 0;
    for (id, description, category, include, is_cc_payment) in rows {
        let (new_category, engine_include) = engine.categorize(&description);
        let new_include = if is_cc_payment { false } else { engine_include };

        if new_category != category || new_include != include {
            conn.execute(
                "UPDATE transactions SET category = ?1, include_in_totals = ?2 WHERE id = ?3",
                params![new_category, new_include, id],
            )?;
            updated += 1;
        }
    }

    Ok(updated)
}

pub fn count_transactions(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
