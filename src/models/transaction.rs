use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user: i64,
    /// Nullable: the backend keeps transactions when their category is deleted
    pub category: Option<Category>,
    /// Decimal serialized as a string by the backend, e.g. "42.50"
    pub amount: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
    pub is_income: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Numeric amount, or 0.0 if the string is malformed
    pub fn amount_value(&self) -> f64 {
        self.amount.parse().unwrap_or(0.0)
    }

    pub fn category_name(&self) -> &str {
        self.category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("Uncategorized")
    }
}

/// Write-side shape for creating or updating a transaction.
/// The backend accepts the category by id under `category_id`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub amount: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub is_income: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction_with_category() {
        let json = r#"{
            "id": 12,
            "user": 1,
            "category": {"id": 3, "name": "Groceries", "type": "expense", "user": 1},
            "amount": "42.50",
            "date": "2025-03-14",
            "note": "weekly shop",
            "is_income": false,
            "created_at": "2025-03-14T18:02:11Z"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.amount_value(), 42.50);
        assert_eq!(tx.category_name(), "Groceries");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[test]
    fn test_parse_transaction_null_category() {
        let json = r#"{
            "id": 13,
            "user": 1,
            "category": null,
            "amount": "10.00",
            "date": "2025-03-15",
            "is_income": true
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert!(tx.category.is_none());
        assert_eq!(tx.category_name(), "Uncategorized");
        assert!(tx.created_at.is_none());
    }

    #[test]
    fn test_new_transaction_omits_empty_optionals() {
        let new = NewTransaction {
            category_id: None,
            amount: "5.00".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            note: None,
            is_income: false,
        };
        let value = serde_json::to_value(&new).unwrap();
        assert!(value.get("category_id").is_none());
        assert!(value.get("note").is_none());
        assert_eq!(value["amount"], "5.00");
    }

    #[test]
    fn test_malformed_amount_is_zero() {
        let json = r#"{
            "id": 1, "user": 1, "category": null,
            "amount": "oops", "date": "2025-01-01", "is_income": false
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.amount_value(), 0.0);
    }
}
