// Spendbook - REST API Server
// Rules CRUD + transactions over Axum; rule mutations reload the engine

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, RwLock};
use tower_http::cors::CorsLayer;

use spendbook::{
    analytics, db, ingest, rule_store, BankCsvParser, CreditCardCsvParser, Rule, RuleDraft,
    RuleEngine, RuleExport, StatementParser, TransactionQuery, TxType,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    engine: Arc<RwLock<RuleEngine>>,
}

type ApiError = (StatusCode, Json<Value>);

fn internal_error(err: anyhow::Error) -> ApiError {
    eprintln!("Error: {:#}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": err.to_string() })),
    )
}

fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "message": message })))
}

/// Rebuild the engine from storage and re-run it over every stored
/// transaction. Called after every rule mutation. Returns how many
/// transactions changed category.
fn reload_and_recategorize(state: &AppState) -> anyhow::Result<usize> {
    let conn = state.db.lock().unwrap();
    let rules = rule_store::list_rules(&conn)?;
    let engine = RuleEngine::from_rules(&rules)?;
    let updated = db::recategorize_all(&conn, &engine)?;
    *state.engine.write().unwrap() = engine;
    Ok(updated)
}

// ============================================================================
// Rule Handlers
// ============================================================================

/// GET /api/rules
async fn get_rules(State(state): State<AppState>) -> Result<Json<Vec<Rule>>, ApiError> {
    let conn = state.db.lock().unwrap();
    let rules = rule_store::list_rules(&conn).map_err(internal_error)?;
    Ok(Json(rules))
}

/// POST /api/rules
async fn create_rule(
    State(state): State<AppState>,
    Json(draft): Json<RuleDraft>,
) -> Result<Json<Rule>, ApiError> {
    let created = {
        let conn = state.db.lock().unwrap();
        rule_store::create_rule(&conn, &draft).map_err(internal_error)?
    };
    reload_and_recategorize(&state).map_err(internal_error)?;
    Ok(Json(created))
}

/// PUT /api/rules/:id
async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(rule): Json<Rule>,
) -> Result<Json<Rule>, ApiError> {
    let updated = {
        let conn = state.db.lock().unwrap();
        match rule_store::get_rule(&conn, id).map_err(internal_error)? {
            Some(_) => rule_store::update_rule(&conn, id, &rule).map_err(internal_error)?,
            None => return Err(not_found("Rule not found")),
        }
    };
    reload_and_recategorize(&state).map_err(internal_error)?;
    Ok(Json(updated))
}

/// DELETE /api/rules/:id
async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    {
        let conn = state.db.lock().unwrap();
        if rule_store::get_rule(&conn, id).map_err(internal_error)?.is_none() {
            return Err(not_found("Rule not found"));
        }
        rule_store::delete_rule(&conn, id).map_err(internal_error)?;
    }
    reload_and_recategorize(&state).map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/rules/reload
async fn reload_rules(State(state): State<AppState>) -> Result<String, ApiError> {
    let updated = reload_and_recategorize(&state).map_err(internal_error)?;
    Ok(format!(
        "Rules reloaded and {} transactions recategorized",
        updated
    ))
}

/// GET /api/rules/export
async fn export_rules(State(state): State<AppState>) -> Result<Json<Vec<RuleExport>>, ApiError> {
    let conn = state.db.lock().unwrap();
    let exported = rule_store::export_rules(&conn).map_err(internal_error)?;
    Ok(Json(exported))
}

#[derive(Debug, Deserialize)]
struct ImportParams {
    #[serde(rename = "skipDuplicates", default)]
    skip_duplicates: bool,
}

/// POST /api/rules/import?skipDuplicates=bool
async fn import_rules(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    Json(rules): Json<Vec<RuleExport>>,
) -> Result<Json<spendbook::ImportResult>, ApiError> {
    let result = {
        let conn = state.db.lock().unwrap();
        rule_store::import_rules(&conn, &rules, params.skip_duplicates).map_err(internal_error)?
    };
    reload_and_recategorize(&state).map_err(internal_error)?;
    Ok(Json(result))
}

// ============================================================================
// Transaction Handlers
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TransactionParams {
    page: u32,
    size: Option<u32>,
    search: Option<String>,
    category: Option<String>,
    #[serde(rename = "type")]
    tx_type: Option<String>,
    #[serde(rename = "fromDate")]
    from_date: Option<NaiveDate>,
    #[serde(rename = "toDate")]
    to_date: Option<NaiveDate>,
}

/// GET /api/transactions
async fn get_transactions(
    State(state): State<AppState>,
    Query(params): Query<TransactionParams>,
) -> Result<Json<spendbook::PagedTransactions>, ApiError> {
    let query = TransactionQuery {
        page: params.page,
        size: params.size.unwrap_or(20),
        search: params.search,
        category: params.category,
        tx_type: params.tx_type.as_deref().and_then(TxType::from_code),
        from_date: params.from_date,
        to_date: params.to_date,
    };

    let conn = state.db.lock().unwrap();
    let page = db::query_transactions(&conn, &query).map_err(internal_error)?;
    Ok(Json(page))
}

/// GET /api/transactions/summary
async fn get_summary(State(state): State<AppState>) -> Result<Json<analytics::Summary>, ApiError> {
    let conn = state.db.lock().unwrap();
    let transactions = db::get_all_transactions(&conn).map_err(internal_error)?;
    Ok(Json(analytics::summarize(&transactions)))
}

/// GET /api/transactions/trend
async fn get_trend(
    State(state): State<AppState>,
) -> Result<Json<Vec<analytics::MonthlyTotals>>, ApiError> {
    let conn = state.db.lock().unwrap();
    let transactions = db::get_all_transactions(&conn).map_err(internal_error)?;
    Ok(Json(analytics::monthly_trend(&transactions)))
}

/// PUT /api/transactions/:id/category  (body: plain-text category name)
async fn update_transaction_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    category: String,
) -> Result<StatusCode, ApiError> {
    let conn = state.db.lock().unwrap();
    let changed =
        db::update_transaction_category(&conn, id, category.trim()).map_err(internal_error)?;
    if changed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Transaction not found"))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UploadParams {
    #[serde(rename = "creditCard")]
    credit_card: bool,
}

/// POST /api/upload?creditCard=bool  (body: CSV statement)
async fn upload_statement(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: String,
) -> Result<Json<ingest::UploadOutcome>, ApiError> {
    let parser: &dyn StatementParser = if params.credit_card {
        &CreditCardCsvParser
    } else {
        &BankCsvParser
    };

    // Lock order matches reload_and_recategorize: db first, then engine
    let conn = state.db.lock().unwrap();
    let engine = state.engine.read().unwrap();
    let outcome = ingest::ingest_statement(&conn, &engine, parser, &body).map_err(internal_error)?;
    Ok(Json(outcome))
}

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Spendbook - API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::var("SPENDBOOK_DB").unwrap_or_else(|_| "spendbook.db".to_string());
    let conn = Connection::open(&db_path).expect("Failed to open database");
    spendbook::setup_database(&conn).expect("Failed to initialize database");
    println!("✓ Database opened: {}", db_path);

    // Compile the stored rules up front; a broken pattern should fail loud
    // at startup, not on the first classify
    let rules = rule_store::list_rules(&conn).expect("Failed to read rules");
    let engine = match RuleEngine::from_rules(&rules) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("❌ Failed to compile rules: {:#}", e);
            eprintln!("   Fix or disable the offending rule and restart.");
            std::process::exit(1);
        }
    };
    println!("✓ Compiled {} enabled rules", engine.rule_count());

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        engine: Arc::new(RwLock::new(engine)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/rules", get(get_rules).post(create_rule))
        .route("/rules/:id", put(update_rule).delete(delete_rule))
        .route("/rules/reload", post(reload_rules))
        .route("/rules/export", get(export_rules))
        .route("/rules/import", post(import_rules))
        .route("/upload", post(upload_statement))
        .route("/transactions", get(get_transactions))
        .route("/transactions/summary", get(get_summary))
        .route("/transactions/trend", get(get_trend))
        .route("/transactions/:id/category", put(update_transaction_category))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = "0.0.0.0:8080";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:8080");
    println!("   Rules: http://localhost:8080/api/rules");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
