// 📊 Analytics - Dashboard aggregates over stored transactions
// Pure folds; the store hands over chronologically ordered rows

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::db::{Transaction, TxType};

/// Headline numbers for the dashboard.
/// Only rows with `include_in_totals` count toward the totals; the
/// breakdown covers expenses by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub category_breakdown: BTreeMap<String, f64>,
    pub transaction_count: usize,
    pub opening_balance: Option<f64>,
    pub closing_balance: Option<f64>,
}

/// One month of income vs expenses, bucketed as `YYYY-MM`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotals {
    pub month: String,
    pub income: f64,
    pub expenses: f64,
}

/// Fold a chronologically ordered transaction slice into the summary
pub fn summarize(transactions: &[Transaction]) -> Summary {
    let mut total_income = 0.0;
    let mut total_expenses = 0.0;
    let mut category_breakdown: BTreeMap<String, f64> = BTreeMap::new();

    for tx in transactions {
        if !tx.include_in_totals {
            continue;
        }
        match tx.tx_type {
            TxType::Credit => total_income += tx.amount.abs(),
            TxType::Debit => {
                total_expenses += tx.amount.abs();
                *category_breakdown.entry(tx.category.clone()).or_insert(0.0) +=
                    tx.amount.abs();
            }
        }
    }

    // First and last running balance the statements reported
    let opening_balance = transactions.iter().find_map(|tx| tx.balance);
    let closing_balance = transactions.iter().rev().find_map(|tx| tx.balance);

    Summary {
        total_income,
        total_expenses,
        category_breakdown,
        transaction_count: transactions.len(),
        opening_balance,
        closing_balance,
    }
}

/// Income vs expenses per month, oldest month first
pub fn monthly_trend(transactions: &[Transaction]) -> Vec<MonthlyTotals> {
    let mut buckets: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for tx in transactions {
        if !tx.include_in_totals {
            continue;
        }
        let month = tx.date.format("%Y-%m").to_string();
        let entry = buckets.entry(month).or_insert((0.0, 0.0));
        match tx.tx_type {
            TxType::Credit => entry.0 += tx.amount.abs(),
            TxType::Debit => entry.1 += tx.amount.abs(),
        }
    }

    buckets
        .into_iter()
        .map(|(month, (income, expenses))| MonthlyTotals {
            month,
            income,
            expenses,
        })
        .collect()
}

/// Average monthly spend per category, across the months the data spans
pub fn average_monthly_by_category(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut months: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    let mut per_category: BTreeMap<String, f64> = BTreeMap::new();

    for tx in transactions {
        if !tx.include_in_totals || tx.tx_type != TxType::Debit {
            continue;
        }
        months.insert(tx.date.format("%Y-%m").to_string());
        *per_category.entry(tx.category.clone()).or_insert(0.0) += tx.amount.abs();
    }

    let month_count = months.len().max(1) as f64;
    per_category
        .into_iter()
        .map(|(category, total)| (category, total / month_count))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
