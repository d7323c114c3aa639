//! Gauge registry for the exported stock series.
//!
//! The set of gauges is closed: one `GaugeVec` per [`StockField`], all registered in
//! [`StockMetrics::new`] and labelled only by `stock_symbol`. Values are stored by the
//! `prometheus` crate as atomic floats, so a render racing a write sees either the old or
//! the new value of a series, never a mix.

use crate::domain::recommendation::recommendation_score;
use crate::domain::snapshot::StockSnapshot;
use anyhow::Context;
use prometheus::core::Collector;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

pub const SYMBOL_LABEL: &str = "stock_symbol";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockField {
    StockPrice,
    EstimateHigh,
    Recommendation,
    DayHigh,
    DayLow,
    DebtToEquity,
    FiftyDayAverage,
    FiftyTwoWeekHigh,
    FiftyTwoWeekLow,
    FullTimeEmployees,
    MarketCap,
    RecommendationMean,
    TargetHighPrice,
    TargetLowPrice,
    TargetMeanPrice,
    TargetMedianPrice,
    TwoHundredDayAverage,
    AuditRisk,
    BoardRisk,
}

impl StockField {
    /// Declaration order; `ALL[f as usize] == f`.
    pub const ALL: [StockField; 19] = [
        StockField::StockPrice,
        StockField::EstimateHigh,
        StockField::Recommendation,
        StockField::DayHigh,
        StockField::DayLow,
        StockField::DebtToEquity,
        StockField::FiftyDayAverage,
        StockField::FiftyTwoWeekHigh,
        StockField::FiftyTwoWeekLow,
        StockField::FullTimeEmployees,
        StockField::MarketCap,
        StockField::RecommendationMean,
        StockField::TargetHighPrice,
        StockField::TargetLowPrice,
        StockField::TargetMeanPrice,
        StockField::TargetMedianPrice,
        StockField::TwoHundredDayAverage,
        StockField::AuditRisk,
        StockField::BoardRisk,
    ];

    pub fn metric_name(self) -> &'static str {
        match self {
            StockField::StockPrice => "stock_price",
            StockField::EstimateHigh => "estimate_high",
            StockField::Recommendation => "recommendation",
            StockField::DayHigh => "stock_day_high",
            StockField::DayLow => "stock_day_low",
            StockField::DebtToEquity => "stock_debt_to_equity",
            StockField::FiftyDayAverage => "stock_fiftyDayAverage",
            StockField::FiftyTwoWeekHigh => "stock_fiftyTwoWeekHigh",
            StockField::FiftyTwoWeekLow => "stock_fiftyTwoWeekLow",
            StockField::FullTimeEmployees => "stock_fullTimeEmployees",
            StockField::MarketCap => "stock_marketCap",
            StockField::RecommendationMean => "stock_recommendationMean",
            StockField::TargetHighPrice => "stock_targetHighPrice",
            StockField::TargetLowPrice => "stock_targetLowPrice",
            StockField::TargetMeanPrice => "stock_targetMeanPrice",
            StockField::TargetMedianPrice => "stock_targetMedianPrice",
            StockField::TwoHundredDayAverage => "stock_twoHundredDayAverage",
            StockField::AuditRisk => "stock_auditRisk",
            StockField::BoardRisk => "stock_boardRisk",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            StockField::StockPrice => "Stock Price",
            StockField::EstimateHigh => "Estimate High",
            StockField::Recommendation => "Recommendation",
            // The per-field gauges are described by their snapshot field name.
            other => other
                .metric_name()
                .strip_prefix("stock_")
                .unwrap_or(other.metric_name()),
        }
    }

    pub fn from_metric_name(name: &str) -> Option<StockField> {
        Self::ALL.into_iter().find(|f| f.metric_name() == name)
    }

    /// The value this gauge takes from a snapshot, if the snapshot carries it.
    pub fn value(self, s: &StockSnapshot) -> Option<f64> {
        match self {
            StockField::StockPrice => s.current_price,
            StockField::EstimateHigh => s.estimate_high(),
            StockField::Recommendation => s
                .recommendation_key
                .as_deref()
                .map(|key| recommendation_score(key) as f64),
            StockField::DayHigh => s.day_high,
            StockField::DayLow => s.day_low,
            StockField::DebtToEquity => s.debt_to_equity,
            StockField::FiftyDayAverage => s.fifty_day_average,
            StockField::FiftyTwoWeekHigh => s.fifty_two_week_high,
            StockField::FiftyTwoWeekLow => s.fifty_two_week_low,
            StockField::FullTimeEmployees => s.full_time_employees,
            StockField::MarketCap => s.market_cap,
            StockField::RecommendationMean => s.recommendation_mean,
            StockField::TargetHighPrice => s.target_high_price,
            StockField::TargetLowPrice => s.target_low_price,
            StockField::TargetMeanPrice => s.target_mean_price,
            StockField::TargetMedianPrice => s.target_median_price,
            StockField::TwoHundredDayAverage => s.two_hundred_day_average,
            StockField::AuditRisk => s.audit_risk,
            StockField::BoardRisk => s.board_risk,
        }
    }
}

pub struct StockMetrics {
    registry: Registry,
    // Indexed by `StockField as usize`.
    gauges: Vec<GaugeVec>,
}

impl StockMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let mut gauges = Vec::with_capacity(StockField::ALL.len());

        for field in StockField::ALL {
            let gauge = GaugeVec::new(
                Opts::new(field.metric_name(), field.help()),
                &[SYMBOL_LABEL],
            )
            .with_context(|| format!("invalid gauge definition: {}", field.metric_name()))?;
            registry
                .register(Box::new(gauge.clone()))
                .with_context(|| format!("failed to register gauge: {}", field.metric_name()))?;
            gauges.push(gauge);
        }

        Ok(Self { registry, gauges })
    }

    fn gauge(&self, field: StockField) -> &GaugeVec {
        &self.gauges[field as usize]
    }

    /// Overwrites the series for `(field, symbol)`; last write wins.
    pub fn set(&self, field: StockField, symbol: &str, value: f64) {
        self.gauge(field).with_label_values(&[symbol]).set(value);
    }

    /// Current value of a series, or `None` if it has never been written.
    pub fn get(&self, field: StockField, symbol: &str) -> Option<f64> {
        // Reads through `collect` so a lookup never creates the series.
        self.gauge(field)
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|m| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == SYMBOL_LABEL && l.get_value() == symbol)
            })
            .map(|m| m.get_gauge().get_value())
    }

    /// Writes every field the snapshot carries and returns how many series were written.
    pub fn apply_snapshot(&self, snapshot: &StockSnapshot) -> usize {
        let mut written = 0;
        for field in StockField::ALL {
            if let Some(value) = field.value(snapshot) {
                self.set(field, &snapshot.symbol, value);
                written += 1;
            }
        }
        written
    }

    pub fn render(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .context("failed to encode metrics")?;
        String::from_utf8(buf).context("encoded metrics are not UTF-8")
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
