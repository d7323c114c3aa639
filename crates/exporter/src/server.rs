use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use stockgauge_core::metrics::StockMetrics;
use tower_http::trace::TraceLayer;

pub const METRICS_PATH: &str = "/metrics";

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<StockMetrics>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(METRICS_PATH, get(get_metrics))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            body,
        )
            .into_response(),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "metrics render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockgauge_core::domain::snapshot::StockSnapshot;
    use stockgauge_core::metrics::StockField;

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn serves_current_registry_state() {
        let metrics = Arc::new(StockMetrics::new().unwrap());
        let mut snap = StockSnapshot::new("AAPL");
        snap.current_price = Some(150.0);
        snap.recommendation_key = Some("buy".to_string());
        metrics.apply_snapshot(&snap);

        let base = serve(AppState {
            metrics: metrics.clone(),
        })
        .await;

        let res = reqwest::get(format!("{base}{METRICS_PATH}")).await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/plain"), "got {content_type}");
        assert!(content_type.contains("version=0.0.4"));

        let body = res.text().await.unwrap();
        // The text encoder prints integral values without a fraction: `150`, not `150.0`.
        assert!(body.contains("stock_price{stock_symbol=\"AAPL\"} 150\n"));
        assert!(body.contains("recommendation{stock_symbol=\"AAPL\"} 1"));

        // Later writes show up on the next scrape; scraping changes nothing.
        metrics.set(StockField::StockPrice, "AAPL", 151.25);
        let body = reqwest::get(format!("{base}{METRICS_PATH}"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("stock_price{stock_symbol=\"AAPL\"} 151.25"));
        assert_eq!(metrics.get(StockField::StockPrice, "AAPL"), Some(151.25));
        assert_eq!(metrics.get(StockField::DayHigh, "AAPL"), None);
    }

    #[tokio::test]
    async fn healthz_and_unknown_paths() {
        let metrics = Arc::new(StockMetrics::new().unwrap());
        let base = serve(AppState { metrics }).await;

        let res = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "ok");

        let res = reqwest::get(format!("{base}/nope")).await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_registry_renders_successfully() {
        let metrics = Arc::new(StockMetrics::new().unwrap());
        let base = serve(AppState { metrics }).await;

        let res = reqwest::get(format!("{base}{METRICS_PATH}")).await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        assert!(!res.text().await.unwrap().contains("stock_symbol"));
    }
}
