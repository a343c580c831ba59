//! Core library for budgetbook - a personal finance tracker.
//!
//! This crate provides the pieces a budgetbook frontend builds on:
//! - `api`: authenticated REST client for the budgetbook backend, including
//!   transparent access-token refresh on 401 responses
//! - `auth`: durable credential storage with swappable backends
//! - `models`: transaction, category, budget, and summary types
//! - `config`: application configuration (API base URL, last username)
//!
//! The backend uses JWT bearer authentication with short-lived access tokens
//! and a long-lived refresh token.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, AuthTransport};
pub use auth::CredentialStore;
pub use config::Config;
