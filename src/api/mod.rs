//! REST API client module for the budgetbook backend.
//!
//! This module provides the `ApiClient` for talking to the backend's
//! finance endpoints and the `AuthTransport` it rides on, which attaches
//! JWT bearer tokens and transparently refreshes an expired access token.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, Page, TransactionQuery};
pub use error::ApiError;
pub use transport::{ApiRequest, AuthTransport};
