use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Monthly spending budget. The backend stores the first day of the month
/// as the key, one budget per user per month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user: i64,
    /// First day of the budgeted month
    pub month: NaiveDate,
    /// Decimal serialized as a string by the backend
    pub amount: String,
}

impl Budget {
    pub fn amount_value(&self) -> f64 {
        self.amount.parse().unwrap_or(0.0)
    }
}

/// Write-side shape for creating a budget
#[derive(Debug, Clone, Serialize)]
pub struct NewBudget {
    pub month: NaiveDate,
    pub amount: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_budget() {
        let json = r#"{"id": 7, "user": 1, "month": "2025-03-01", "amount": "1200.00"}"#;
        let budget: Budget = serde_json::from_str(json).unwrap();
        assert_eq!(budget.amount_value(), 1200.0);
        assert_eq!(budget.month.format("%Y-%m").to_string(), "2025-03");
    }
}
