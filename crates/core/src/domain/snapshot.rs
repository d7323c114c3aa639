use chrono::{DateTime, Utc};

/// One fetched view of a security. Every data field is optional: the upstream quote API
/// omits whatever it does not cover for a given listing (funds have no board risk, some
/// exchanges carry no analyst targets).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockSnapshot {
    pub symbol: String,
    pub fetched_at: DateTime<Utc>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub current_price: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub fifty_day_average: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub full_time_employees: Option<f64>,
    pub market_cap: Option<f64>,
    pub recommendation_key: Option<String>,
    pub recommendation_mean: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub target_median_price: Option<f64>,
    pub two_hundred_day_average: Option<f64>,
    pub audit_risk: Option<f64>,
    pub board_risk: Option<f64>,
}

impl StockSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            fetched_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Highest analyst price target.
    pub fn estimate_high(&self) -> Option<f64> {
        self.target_high_price
    }
}
