use crate::domain::snapshot::StockSnapshot;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// quoteSummary modules requested per symbol, in lookup priority order.
pub const QUOTE_MODULES: [&str; 4] = ["financialData", "summaryDetail", "assetProfile", "price"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryEnvelope {
    pub quote_summary: QuoteSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSummary {
    #[serde(default)]
    pub result: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    pub error: Option<QuoteSummaryError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSummaryError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl QuoteSummaryError {
    pub fn describe(&self) -> String {
        format!(
            "{}: {}",
            self.code.as_deref().unwrap_or("unknown"),
            self.description.as_deref().unwrap_or("no description")
        )
    }
}

/// Merges the requested modules into a single key space.
///
/// Earlier modules in [`QUOTE_MODULES`] win on key collisions. Formatted wrappers like
/// `{"raw": 1.5, "fmt": "1.50"}` collapse to their raw value; nulls, empty wrappers and
/// nested structures are dropped.
pub fn flatten_modules(result: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for module in QUOTE_MODULES {
        let Some(Value::Object(fields)) = result.get(module) else {
            continue;
        };

        for (key, value) in fields {
            if out.contains_key(key) {
                continue;
            }
            if let Some(v) = unwrap_value(value) {
                out.insert(key.clone(), v);
            }
        }
    }
    out
}

fn unwrap_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null | Value::Array(_) => None,
        Value::Object(o) => o.get("raw").filter(|v| !v.is_null()).cloned(),
        other => Some(other.clone()),
    }
}

pub fn snapshot_from_info(
    symbol: &str,
    info: &Map<String, Value>,
    fetched_at: DateTime<Utc>,
) -> StockSnapshot {
    let number = |key: &str| info.get(key).and_then(Value::as_f64);
    let text = |key: &str| {
        info.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    StockSnapshot {
        symbol: symbol.to_string(),
        fetched_at,
        currency: text("currency").or_else(|| text("financialCurrency")),
        exchange: text("exchange"),
        current_price: number("currentPrice"),
        day_high: number("dayHigh"),
        day_low: number("dayLow"),
        debt_to_equity: number("debtToEquity"),
        fifty_day_average: number("fiftyDayAverage"),
        fifty_two_week_high: number("fiftyTwoWeekHigh"),
        fifty_two_week_low: number("fiftyTwoWeekLow"),
        full_time_employees: number("fullTimeEmployees"),
        market_cap: number("marketCap"),
        // Passed through verbatim; only the score mapping decides what is recognised.
        recommendation_key: info
            .get("recommendationKey")
            .and_then(Value::as_str)
            .map(str::to_string),
        recommendation_mean: number("recommendationMean"),
        target_high_price: number("targetHighPrice"),
        target_low_price: number("targetLowPrice"),
        target_mean_price: number("targetMeanPrice"),
        target_median_price: number("targetMedianPrice"),
        two_hundred_day_average: number("twoHundredDayAverage"),
        audit_risk: number("auditRisk"),
        board_risk: number("boardRisk"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StockField;
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(o) => o,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn flattens_raw_wrappers_and_drops_empty_values() {
        let result = as_map(json!({
            "financialData": {
                "currentPrice": {"raw": 150.25, "fmt": "150.25"},
                "recommendationKey": "buy",
                "debtToEquity": {},
                "targetLowPrice": null
            },
            "assetProfile": {
                "fullTimeEmployees": 161000,
                "companyOfficers": [{"name": "someone"}]
            }
        }));

        let flat = flatten_modules(&result);
        assert_eq!(flat.get("currentPrice"), Some(&json!(150.25)));
        assert_eq!(flat.get("recommendationKey"), Some(&json!("buy")));
        assert_eq!(flat.get("fullTimeEmployees"), Some(&json!(161000)));
        assert!(!flat.contains_key("debtToEquity"));
        assert!(!flat.contains_key("targetLowPrice"));
        assert!(!flat.contains_key("companyOfficers"));
    }

    #[test]
    fn earlier_modules_win_on_collisions() {
        let result = as_map(json!({
            "price": {"marketCap": {"raw": 1.0}, "exchange": "NMS"},
            "summaryDetail": {"marketCap": {"raw": 2.0}}
        }));

        let flat = flatten_modules(&result);
        assert_eq!(flat.get("marketCap"), Some(&json!(2.0)));
        assert_eq!(flat.get("exchange"), Some(&json!("NMS")));
    }

    #[test]
    fn builds_snapshot_with_missing_fields_as_none() {
        let info = as_map(json!({
            "currentPrice": 150.0,
            "targetHighPrice": 200.0,
            "recommendationKey": "hold",
            "financialCurrency": "USD",
            "dayHigh": "n/a"
        }));

        let snap = snapshot_from_info("AAPL", &info, Utc::now());
        assert_eq!(snap.symbol, "AAPL");
        assert_eq!(snap.current_price, Some(150.0));
        assert_eq!(snap.estimate_high(), Some(200.0));
        assert_eq!(snap.recommendation_key.as_deref(), Some("hold"));
        assert_eq!(snap.currency.as_deref(), Some("USD"));
        assert_eq!(snap.day_high, None);
        assert_eq!(snap.board_risk, None);
        assert_eq!(snap.exchange, None);
    }

    #[test]
    fn maps_every_upstream_key_to_its_own_field() {
        let info = as_map(json!({
            "currency": "EUR",
            "exchange": "AMS",
            "currentPrice": 1.0,
            "dayHigh": 2.0,
            "dayLow": 3.0,
            "debtToEquity": 4.0,
            "fiftyDayAverage": 5.0,
            "fiftyTwoWeekHigh": 6.0,
            "fiftyTwoWeekLow": 7.0,
            "fullTimeEmployees": 8.0,
            "marketCap": 9.0,
            "recommendationKey": "sell",
            "recommendationMean": 10.0,
            "targetHighPrice": 11.0,
            "targetLowPrice": 12.0,
            "targetMeanPrice": 13.0,
            "targetMedianPrice": 14.0,
            "twoHundredDayAverage": 15.0,
            "auditRisk": 16.0,
            "boardRisk": 17.0
        }));

        let snap = snapshot_from_info("MT.AS", &info, Utc::now());
        assert_eq!(snap.currency.as_deref(), Some("EUR"));
        assert_eq!(snap.exchange.as_deref(), Some("AMS"));
        assert_eq!(snap.current_price, Some(1.0));
        assert_eq!(snap.day_high, Some(2.0));
        assert_eq!(snap.day_low, Some(3.0));
        assert_eq!(snap.debt_to_equity, Some(4.0));
        assert_eq!(snap.fifty_day_average, Some(5.0));
        assert_eq!(snap.fifty_two_week_high, Some(6.0));
        assert_eq!(snap.fifty_two_week_low, Some(7.0));
        assert_eq!(snap.full_time_employees, Some(8.0));
        assert_eq!(snap.market_cap, Some(9.0));
        assert_eq!(snap.recommendation_key.as_deref(), Some("sell"));
        assert_eq!(snap.recommendation_mean, Some(10.0));
        assert_eq!(snap.target_high_price, Some(11.0));
        assert_eq!(snap.target_low_price, Some(12.0));
        assert_eq!(snap.target_mean_price, Some(13.0));
        assert_eq!(snap.target_median_price, Some(14.0));
        assert_eq!(snap.two_hundred_day_average, Some(15.0));
        assert_eq!(snap.audit_risk, Some(16.0));
        assert_eq!(snap.board_risk, Some(17.0));
    }

    #[test]
    fn recommendation_key_is_passed_through_verbatim() {
        let info = as_map(json!({"recommendationKey": " buy"}));
        let snap = snapshot_from_info("AAPL", &info, Utc::now());
        assert_eq!(snap.recommendation_key.as_deref(), Some(" buy"));
        assert_eq!(StockField::Recommendation.value(&snap), Some(0.0));

        let info = as_map(json!({"recommendationKey": "buy"}));
        let snap = snapshot_from_info("AAPL", &info, Utc::now());
        assert_eq!(StockField::Recommendation.value(&snap), Some(1.0));
    }

    #[test]
    fn parses_error_envelope() {
        let v = json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: NOPE"}
            }
        });

        let env: QuoteSummaryEnvelope = serde_json::from_value(v).unwrap();
        assert!(env.quote_summary.result.is_none());
        let err = env.quote_summary.error.unwrap();
        assert_eq!(err.describe(), "Not Found: Quote not found for symbol: NOPE");
    }
}
