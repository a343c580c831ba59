//! Data models for the budgetbook API.
//!
//! Read-side types mirror what the backend serializes; `New*` types carry
//! the write-side shape for create/update calls. Decimal amounts arrive as
//! strings and are kept as strings, with helpers for numeric access.

pub mod budget;
pub mod category;
pub mod summary;
pub mod transaction;
pub mod user;

pub use budget::{Budget, NewBudget};
pub use category::{Category, CategoryKind, NewCategory};
pub use summary::Summary;
pub use transaction::{NewTransaction, Transaction};
pub use user::User;
