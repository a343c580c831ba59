//! Authentication module for managing stored credentials.
//!
//! This module provides:
//! - `TokenStorage`: a small key-value trait so the persistence backend
//!   (plain file, OS keychain, in-memory) is swappable
//! - `CredentialStore`: typed access to the access token, refresh token,
//!   and cached user record
//!
//! Credentials persist across application restarts with the file and
//! keychain backends.

pub mod store;

pub use store::{CredentialStore, FileStorage, KeyringStorage, MemoryStorage, TokenStorage};
