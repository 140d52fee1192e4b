//! Market snapshot model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time quote and valuation data for one stock.
///
/// Fetched once per run before the session opens; a run without a usable
/// snapshot is aborted (unrecoverable precondition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub code: String,
    pub name: String,
    /// Last traded price.
    pub price: f64,
    /// Percent change on the day.
    pub change_percent: f64,
    /// Turnover in the quote currency.
    pub turnover: f64,
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub pb_ratio: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// A snapshot with no positive price carries no information the pipeline
    /// can work from.
    pub fn is_usable(&self) -> bool {
        self.price > 0.0 && self.price.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price: f64) -> MarketSnapshot {
        MarketSnapshot {
            code: "600000".to_string(),
            name: "SPD Bank".to_string(),
            price,
            change_percent: 1.2,
            turnover: 1_000_000.0,
            pe_ratio: Some(6.1),
            pb_ratio: Some(0.8),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_usability() {
        assert!(snapshot(8.42).is_usable());
        assert!(!snapshot(0.0).is_usable());
        assert!(!snapshot(f64::NAN).is_usable());
    }
}
