// 🌐 API Client - Bridge to a remote tracker backend
// Thin request/response wrappers plus the fetch-plan-persist flow

use reqwest::Client;
use thiserror::Error;

use crate::analytics::Summary;
use crate::db::{PagedTransactions, TransactionQuery};
use crate::ingest::UploadOutcome;
use crate::merge::{self, MergeError, MergePlan};
use crate::rule::{ImportResult, Rule, RuleDraft, RuleExport};

/// Client-side failure taxonomy. Validation errors come from the merge
/// planner before any request is made; the rest are transport or backend
/// failures the caller surfaces generically and retries.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(#[from] MergeError),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// What a submitted condition ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum MergeApplied {
    Created(Rule),
    Updated(Rule),
}

/// HTTP client for the tracker's REST API
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiClient {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    pub async fn list_rules(&self) -> Result<Vec<Rule>, ClientError> {
        let response = self.http.get(self.url("/api/rules")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn get_rule_by_id(&self, id: i64) -> Result<Option<Rule>, ClientError> {
        // The backend has no single-rule endpoint; filter the list
        let rules = self.list_rules().await?;
        Ok(rules.into_iter().find(|rule| rule.id == id))
    }

    pub async fn create_rule(&self, draft: &RuleDraft) -> Result<Rule, ClientError> {
        let response = self
            .http
            .post(self.url("/api/rules"))
            .json(draft)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn update_rule(&self, id: i64, rule: &Rule) -> Result<Rule, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/api/rules/{}", id)))
            .json(rule)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn delete_rule(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/rules/{}", id)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Ask the backend to rebuild its rule engine; returns its status line
    pub async fn reload_rules(&self) -> Result<String, ClientError> {
        let response = self.http.post(self.url("/api/rules/reload")).send().await?;
        Ok(check(response).await?.text().await?)
    }

    pub async fn export_rules(&self) -> Result<Vec<RuleExport>, ClientError> {
        let response = self.http.get(self.url("/api/rules/export")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn import_rules(
        &self,
        rules: &[RuleExport],
        skip_duplicates: bool,
    ) -> Result<ImportResult, ClientError> {
        let response = self
            .http
            .post(self.url("/api/rules/import"))
            .query(&[("skipDuplicates", skip_duplicates)])
            .json(rules)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Upload a CSV statement for ingestion
    pub async fn upload_statement(
        &self,
        csv: &str,
        credit_card: bool,
    ) -> Result<UploadOutcome, ClientError> {
        let response = self
            .http
            .post(self.url("/api/upload"))
            .query(&[("creditCard", credit_card)])
            .header("Content-Type", "text/csv")
            .body(csv.to_string())
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<PagedTransactions, ClientError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("size", query.size.max(1).to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(tx_type) = query.tx_type {
            params.push(("type", tx_type.as_str().to_string()));
        }
        if let Some(from) = query.from_date {
            params.push(("fromDate", from.to_string()));
        }
        if let Some(to) = query.to_date {
            params.push(("toDate", to.to_string()));
        }

        let response = self
            .http
            .get(self.url("/api/transactions"))
            .query(&params)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn summary(&self) -> Result<Summary, ClientError> {
        let response = self
            .http
            .get(self.url("/api/transactions/summary"))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn update_transaction_category(
        &self,
        id: i64,
        category: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/api/transactions/{}/category", id)))
            .header("Content-Type", "text/plain")
            .body(category.to_string())
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Add rule from transaction
    // ------------------------------------------------------------------

    /// The dialog's submit path: fetch the current rules, plan the merge,
    /// persist whichever outcome came back. Validation failures surface
    /// before any write; transport failures leave nothing half-done
    /// because the plan is a single create or a single update.
    pub async fn submit_rule_condition(
        &self,
        category: &str,
        condition: &str,
    ) -> Result<MergeApplied, ClientError> {
        let existing = self.list_rules().await?;

        match merge::plan(category, condition, &existing)? {
            MergePlan::Create(draft) => {
                let created = self.create_rule(&draft).await?;
                Ok(MergeApplied::Created(created))
            }
            MergePlan::Update { rule_id, rule } => {
                let updated = self.update_rule(rule_id, &rule).await?;
                Ok(MergeApplied::Updated(updated))
            }
        }
    }
}

/// Turn non-2xx responses into `ClientError::Api` with the body text
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.url("/api/rules"), "http://localhost:8080/api/rules");

        let bare = ApiClient::new("http://localhost:8080");
        assert_eq!(bare.url("/api/rules/7"), "http://localhost:8080/api/rules/7");
    }

    #[test]
    fn test_validation_error_carries_merge_reason() {
        let err = ClientError::from(MergeError::DuplicateCondition);
        assert_eq!(err.to_string(), "this condition already exists in the rule");
    }
}
