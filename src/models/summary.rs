use serde::{Deserialize, Deserializer, Serialize};

/// Account summary returned by `GET finance/summary/`.
///
/// The backend aggregates decimals and hands them to its JSON encoder,
/// which emits numbers or strings depending on configuration, so parsing
/// accepts both.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Summary {
    #[serde(deserialize_with = "flexible_f64")]
    pub total_income: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub total_expenses: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub balance: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub monthly_expenses: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub monthly_budget: f64,
}

impl Summary {
    /// Remaining budget for the current month (negative when over budget)
    pub fn monthly_remaining(&self) -> f64 {
        self.monthly_budget - self.monthly_expenses
    }
}

/// Accept a JSON number or a numeric string
fn flexible_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary_numbers() {
        let json = r#"{
            "total_income": 5000.0,
            "total_expenses": 3200.5,
            "balance": 1799.5,
            "monthly_expenses": 800.0,
            "monthly_budget": 1000
        }"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.monthly_remaining(), 200.0);
    }

    #[test]
    fn test_parse_summary_decimal_strings() {
        let json = r#"{
            "total_income": "5000.00",
            "total_expenses": "3200.50",
            "balance": "1799.50",
            "monthly_expenses": "800.00",
            "monthly_budget": "1000.00"
        }"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.total_expenses, 3200.5);
    }

    #[test]
    fn test_parse_summary_missing_balance() {
        // older backend builds omit the balance field
        let json = r#"{
            "total_income": 10,
            "total_expenses": 4,
            "monthly_expenses": 2,
            "monthly_budget": 3
        }"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.balance, 0.0);
    }
}
