use anyhow::Result;
use rusqlite::Connection;
use std::env;
use std::fs;
use std::path::PathBuf;

use spendbook::{
    analytics, count_transactions, get_all_transactions, ingest_statement, list_rules,
    recategorize_all, seed_default_rules, setup_database, BankCsvParser, CreditCardCsvParser,
    RuleEngine, StatementParser,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init()?,
        Some("seed") => run_seed()?,
        Some("import") => run_import(&args[2..])?,
        Some("recategorize") => run_recategorize()?,
        Some("summary") => run_summary()?,
        _ => print_usage(),
    }

    Ok(())
}

fn print_usage() {
    println!("spendbook - personal finance tracker");
    println!();
    println!("Usage:");
    println!("  spendbook init                        create the database");
    println!("  spendbook seed                        install default keyword rules");
    println!("  spendbook import <file> [--credit-card]  ingest a CSV statement");
    println!("  spendbook recategorize                re-run rules over stored transactions");
    println!("  spendbook summary                     print dashboard totals");
    println!();
    println!("Database path comes from SPENDBOOK_DB (default: spendbook.db)");
}

fn db_path() -> PathBuf {
    env::var("SPENDBOOK_DB")
        .unwrap_or_else(|_| "spendbook.db".to_string())
        .into()
}

fn open_db() -> Result<Connection> {
    let path = db_path();
    let conn = Connection::open(&path)?;
    setup_database(&conn)?;
    Ok(conn)
}

fn load_engine(conn: &Connection) -> Result<RuleEngine> {
    let rules = list_rules(conn)?;
    RuleEngine::from_rules(&rules)
}

fn run_init() -> Result<()> {
    println!("🗄️  Initializing database at {:?}", db_path());
    open_db()?;
    println!("✓ Database initialized with WAL mode");
    Ok(())
}

fn run_seed() -> Result<()> {
    let conn = open_db()?;

    println!("🏷️  Seeding default keyword rules...");
    let created = seed_default_rules(&conn)?;
    if created == 0 {
        println!("✓ Nothing to do, default rules already present");
    } else {
        println!("✓ Created {} default rules", created);
    }
    Ok(())
}

fn run_import(args: &[String]) -> Result<()> {
    let Some(file) = args.first() else {
        eprintln!("❌ Missing statement file");
        eprintln!("   Usage: spendbook import <file> [--credit-card]");
        std::process::exit(1);
    };
    let credit_card = args.iter().any(|a| a == "--credit-card");

    let conn = open_db()?;
    let engine = load_engine(&conn)?;
    println!("⚙️  Loaded {} enabled rules", engine.rule_count());

    let parser: &dyn StatementParser = if credit_card {
        &CreditCardCsvParser
    } else {
        &BankCsvParser
    };

    println!("\n📂 Importing {} as {}...", file, parser.source_name());
    let content = fs::read_to_string(file)?;
    let outcome = ingest_statement(&conn, &engine, parser, &content)?;

    println!("✓ Processed {} rows", outcome.rows_processed);
    println!("✓ Saved {} transactions", outcome.rows_saved);
    if outcome.duplicates > 0 {
        println!("✓ Skipped {} duplicates", outcome.duplicates);
    }
    if outcome.errors > 0 {
        println!("⚠️  {} rows failed to parse", outcome.errors);
    }
    println!("\n🔍 Database now holds {} transactions", count_transactions(&conn)?);
    Ok(())
}

fn run_recategorize() -> Result<()> {
    let conn = open_db()?;
    let engine = load_engine(&conn)?;

    println!("⚙️  Recategorizing with {} enabled rules...", engine.rule_count());
    let updated = recategorize_all(&conn, &engine)?;
    println!("✓ {} transactions recategorized", updated);
    Ok(())
}

fn run_summary() -> Result<()> {
    let conn = open_db()?;
    let transactions = get_all_transactions(&conn)?;
    let summary = analytics::summarize(&transactions);

    println!("📊 Summary ({} transactions)", summary.transaction_count);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Income:   {:>12.2}", summary.total_income);
    println!("  Expenses: {:>12.2}", summary.total_expenses);
    if let (Some(open), Some(close)) = (summary.opening_balance, summary.closing_balance) {
        println!("  Balance:  {:>12.2} → {:.2}", open, close);
    }

    if !summary.category_breakdown.is_empty() {
        println!("\n  By category:");
        let mut entries: Vec<_> = summary.category_breakdown.iter().collect();
        entries.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (category, total) in entries {
            println!("    {:<24} {:>12.2}", category, total);
        }
    }
    Ok(())
}
