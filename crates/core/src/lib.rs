pub mod domain;
pub mod ingest;
pub mod metrics;
pub mod poller;

pub mod config {
    use std::net::SocketAddr;
    use std::time::Duration;

    pub const DEFAULT_STOCKS: [&str; 6] = ["AAPL", "GOOGL", "MSFT", "AMZN", "PHARM.AS", "MT.AS"];
    pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
    pub const DEFAULT_METRICS_PORT: u16 = 8000;
    pub const DEFAULT_DATA_PROVIDER_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub stocks: Vec<String>,
        pub poll_interval: Duration,
        pub metrics_port: u16,
        pub data_provider_base_url: Option<String>,
        pub data_provider_timeout: Duration,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Same parsing as [`Settings::from_env`], against an arbitrary key lookup.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let poll_interval_secs = lookup("POLL_INTERVAL_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

            let metrics_port = lookup("METRICS_PORT")
                .and_then(|s| s.trim().parse::<u16>().ok())
                .unwrap_or(DEFAULT_METRICS_PORT);

            let timeout_secs = lookup("DATA_PROVIDER_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_DATA_PROVIDER_TIMEOUT_SECS);

            Ok(Self {
                stocks: parse_stocks(lookup("STOCKS").as_deref()),
                poll_interval: Duration::from_secs(poll_interval_secs),
                metrics_port,
                data_provider_base_url: lookup("DATA_PROVIDER_BASE_URL")
                    .filter(|s| !s.trim().is_empty()),
                data_provider_timeout: Duration::from_secs(timeout_secs),
                sentry_dsn: lookup("SENTRY_DSN").filter(|s| !s.trim().is_empty()),
            })
        }

        pub fn metrics_addr(&self) -> SocketAddr {
            SocketAddr::from(([0, 0, 0, 0], self.metrics_port))
        }
    }

    /// Splits a comma-separated symbol list, falling back to [`DEFAULT_STOCKS`] when nothing
    /// usable is configured.
    pub fn parse_stocks(raw: Option<&str>) -> Vec<String> {
        let parsed: Vec<String> = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if parsed.is_empty() {
            DEFAULT_STOCKS.iter().map(|s| s.to_string()).collect()
        } else {
            parsed
        }
    }

}
