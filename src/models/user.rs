use serde::{Deserialize, Serialize};

/// Cached user identity stored alongside the tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}
