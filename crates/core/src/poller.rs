use crate::ingest::error::FetchError;
use crate::ingest::provider::StockDataProvider;
use crate::metrics::StockMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub updated: usize,
    pub failed: usize,
}

/// Fetches every configured symbol in turn and writes the results into the registry.
pub struct Poller {
    provider: Arc<dyn StockDataProvider>,
    metrics: Arc<StockMetrics>,
    symbols: Vec<String>,
    interval: Duration,
}

impl Poller {
    pub fn new(
        provider: Arc<dyn StockDataProvider>,
        metrics: Arc<StockMetrics>,
        symbols: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            metrics,
            symbols,
            interval,
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// One pass over all symbols. A failed symbol keeps its previous values and does not
    /// stop the pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for symbol in &self.symbols {
            tracing::info!(%symbol, "updating metrics");

            match self.provider.fetch_snapshot(symbol).await {
                Ok(snapshot) => {
                    let written = self.metrics.apply_snapshot(&snapshot);
                    tracing::debug!(
                        %symbol,
                        written,
                        currency = snapshot.currency.as_deref().unwrap_or("-"),
                        exchange = snapshot.exchange.as_deref().unwrap_or("-"),
                        "metrics updated"
                    );
                    report.updated += 1;
                }
                Err(err) => {
                    let stage = err
                        .downcast_ref::<FetchError>()
                        .map(|e| e.stage)
                        .unwrap_or("unknown");
                    tracing::warn!(
                        %symbol,
                        stage,
                        provider = self.provider.provider_name(),
                        error = %format!("{err:#}"),
                        "stock fetch failed; keeping previous values"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Runs cycles until `stop` turns `true` or its sender goes away, sleeping `interval`
    /// between cycles. Returns the number of completed cycles.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) -> u64 {
        let mut cycles: u64 = 0;

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            let report = self.run_cycle().await;
            cycles += 1;
            tracing::debug!(
                cycle = cycles,
                updated = report.updated,
                failed = report.failed,
                "update cycle finished"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(cycles, "update loop stopped");
        cycles
    }
}
