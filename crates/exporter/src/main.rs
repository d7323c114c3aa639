use anyhow::Context;
use std::sync::Arc;
use stockgauge_core::ingest::provider::{StockDataProvider, YahooFinanceProvider};
use stockgauge_core::metrics::StockMetrics;
use stockgauge_core::poller::Poller;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockgauge_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if let Err(err) = run(settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "exporter stopped");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: stockgauge_core::config::Settings) -> anyhow::Result<()> {
    let metrics = Arc::new(StockMetrics::new()?);
    let provider: Arc<dyn StockDataProvider> =
        Arc::new(YahooFinanceProvider::from_settings(&settings)?);

    let poller = Poller::new(
        provider.clone(),
        metrics.clone(),
        settings.stocks.clone(),
        settings.poll_interval,
    );

    let addr = settings.metrics_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {addr}"))?;

    tracing::info!(
        %addr,
        path = server::METRICS_PATH,
        provider = provider.provider_name(),
        symbols = ?poller.symbols(),
        interval_secs = settings.poll_interval.as_secs(),
        "metrics exporter listening"
    );

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let updates = tokio::spawn(async move { poller.run(stop_rx).await });

    let app = server::router(server::AppState { metrics });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("metrics server failed")?;

    let _ = stop_tx.send(true);
    let cycles = updates.await.context("update loop task failed")?;
    tracing::info!(cycles, "exporter shut down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stockgauge_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
