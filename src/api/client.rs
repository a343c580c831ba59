//! API client for the budgetbook backend.
//!
//! Thin typed layer over `AuthTransport`: endpoint paths, query parameters,
//! and response parsing. Token refresh and sign-out live in the transport.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::auth::CredentialStore;
use crate::models::{
    Budget, Category, NewBudget, NewCategory, NewTransaction, Summary, Transaction, User,
};

use super::{ApiError, ApiRequest, AuthTransport};

/// One page of a list endpoint.
///
/// The backend paginates with `{count, next, previous, results}`, but some
/// deployments run with pagination disabled and return a plain array, so
/// list parsing accepts both.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    fn from_results(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }
}

/// Filters for the transaction list endpoint
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Matches against the transaction note
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub is_income: Option<bool>,
    /// Sort key, e.g. "date", "-date", "amount"
    pub ordering: Option<String>,
}

impl TransactionQuery {
    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(page) = self.page {
            request = request.query("page", page);
        }
        if let Some(page_size) = self.page_size {
            request = request.query("page_size", page_size);
        }
        if let Some(ref search) = self.search {
            request = request.query("search", search);
        }
        if let Some(category_id) = self.category_id {
            // filter parameter follows the backend's relation syntax
            request = request.query("category__id", category_id);
        }
        if let Some(is_income) = self.is_income {
            request = request.query("is_income", is_income);
        }
        if let Some(ref ordering) = self.ordering {
            request = request.query("ordering", ordering);
        }
        request
    }
}

/// API client for the budgetbook backend.
/// Clone is cheap - the transport is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<AuthTransport>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<CredentialStore>) -> Result<Self> {
        let transport = AuthTransport::new(base_url, store)?;
        Ok(Self {
            transport: Arc::new(transport),
        })
    }

    pub fn with_transport(transport: Arc<AuthTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &AuthTransport {
        &self.transport
    }

    // ===== Auth =====

    /// Authenticate and store the token pair plus the cached user
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        #[derive(Deserialize)]
        struct TokenPair {
            access: String,
            refresh: String,
        }

        let request = ApiRequest::post("auth/token/")
            .json(serde_json::json!({ "username": username, "password": password }));
        let response = self.transport.send(request).await?;
        let response = Self::check_response(response).await?;
        let tokens: TokenPair = response
            .json()
            .await
            .context("Failed to parse token response")?;

        let store = self.transport.store();
        store.set_tokens(&tokens.access, &tokens.refresh)?;
        let user = User {
            username: username.to_string(),
        };
        store.set_user(&user)?;
        debug!(username, "Logged in");
        Ok(user)
    }

    /// Clear credentials and fire the session-terminated hook
    pub fn logout(&self) {
        self.transport.sign_out();
    }

    /// Cached identity from the last login, if any
    pub fn current_user(&self) -> Option<User> {
        self.transport.store().user()
    }

    // ===== Summary =====

    pub async fn fetch_summary(&self) -> Result<Summary> {
        self.get_json(ApiRequest::get("finance/summary/")).await
    }

    // ===== Transactions =====

    pub async fn list_transactions(&self, query: &TransactionQuery) -> Result<Page<Transaction>> {
        let request = query.apply(ApiRequest::get("finance/transactions/"));
        let response = self.transport.send(request).await?;
        let response = Self::check_response(response).await?;
        let text = response
            .text()
            .await
            .context("Failed to read transactions response body")?;

        // Paginated shape first, plain array as fallback
        if let Ok(page) = serde_json::from_str::<Page<Transaction>>(&text) {
            return Ok(page);
        }
        let results: Vec<Transaction> =
            serde_json::from_str(&text).context("Failed to parse transactions response")?;
        debug!(count = results.len(), "Transactions returned unpaginated");
        Ok(Page::from_results(results))
    }

    pub async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let request = ApiRequest::post("finance/transactions/").json(serde_json::to_value(new)?);
        self.get_json(request).await
    }

    pub async fn update_transaction(&self, id: i64, new: &NewTransaction) -> Result<Transaction> {
        let request = ApiRequest::put(format!("finance/transactions/{}/", id))
            .json(serde_json::to_value(new)?);
        self.get_json(request).await
    }

    pub async fn delete_transaction(&self, id: i64) -> Result<()> {
        let request = ApiRequest::delete(format!("finance/transactions/{}/", id));
        let response = self.transport.send(request).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Categories =====

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.list_all(ApiRequest::get("finance/categories/"), "categories")
            .await
    }

    pub async fn create_category(&self, new: &NewCategory) -> Result<Category> {
        let request = ApiRequest::post("finance/categories/").json(serde_json::to_value(new)?);
        self.get_json(request).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        let request = ApiRequest::delete(format!("finance/categories/{}/", id));
        let response = self.transport.send(request).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Budgets =====

    pub async fn list_budgets(&self) -> Result<Vec<Budget>> {
        self.list_all(ApiRequest::get("finance/budgets/"), "budgets")
            .await
    }

    pub async fn create_budget(&self, new: &NewBudget) -> Result<Budget> {
        let request = ApiRequest::post("finance/budgets/").json(serde_json::to_value(new)?);
        self.get_json(request).await
    }

    pub async fn delete_budget(&self, id: i64) -> Result<()> {
        let request = ApiRequest::delete(format!("finance/budgets/{}/", id));
        let response = self.transport.send(request).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Helpers =====

    async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let path = request.path().to_string();
        let response = self.transport.send(request).await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    /// Fetch an unfiltered list, accepting either a plain array or one page
    async fn list_all<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        what: &str,
    ) -> Result<Vec<T>> {
        let response = self.transport.send(request).await?;
        let response = Self::check_response(response).await?;
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response body", what))?;

        if let Ok(items) = serde_json::from_str::<Vec<T>>(&text) {
            return Ok(items);
        }
        let page: Page<T> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {} response", what))?;
        Ok(page.results)
    }

    /// Check if response is successful, returning an error with body if not
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }
}
