use crate::config::Settings;
use crate::domain::snapshot::StockSnapshot;
use crate::ingest::error::FetchError;
use crate::ingest::types::{flatten_modules, snapshot_from_info, QuoteSummaryEnvelope, QUOTE_MODULES};
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{StatusCode, Url};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[async_trait::async_trait]
pub trait StockDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_snapshot(&self, symbol: &str) -> Result<StockSnapshot>;
}

#[derive(Debug)]
pub struct YahooFinanceProvider {
    http: reqwest::Client,
    base_url: Url,
    cookie_url: String,

    // quoteSummary rejects requests without a crumb bound to the session cookie.
    crumb: tokio::sync::Mutex<Option<String>>,
}

impl YahooFinanceProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .data_provider_base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        Self::new(base_url, COOKIE_URL, settings.data_provider_timeout)
    }

    pub fn new(base_url: &str, cookie_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid data provider base URL: {base_url}"))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build data provider http client")?;

        Ok(Self {
            http,
            base_url,
            cookie_url: cookie_url.to_string(),
            crumb: tokio::sync::Mutex::new(None),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("data provider base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn crumb(&self, symbol: &str) -> Result<String> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        let crumb = self
            .fetch_crumb()
            .await
            .map_err(|err| FetchError::new(symbol, "crumb", format!("{err:#}")))?;
        tracing::debug!("obtained data provider crumb");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // Only the cookies matter here; the status is routinely 404.
        if let Err(err) = self.http.get(&self.cookie_url).send().await {
            tracing::debug!(error = %err, "cookie bootstrap request failed");
        }

        let res = self
            .http
            .get(self.endpoint(&["v1", "test", "getcrumb"])?)
            .send()
            .await
            .context("crumb request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read crumb response")?;
        if !status.is_success() {
            anyhow::bail!("crumb HTTP {status}: {text}");
        }

        let crumb = text.trim();
        anyhow::ensure!(
            !crumb.is_empty() && !crumb.contains(&['<', ' '][..]),
            "crumb response is not a crumb: {text}"
        );
        Ok(crumb.to_string())
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }
}

#[async_trait::async_trait]
impl StockDataProvider for YahooFinanceProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<StockSnapshot> {
        let crumb = self.crumb(symbol).await?;
        let modules = QUOTE_MODULES.join(",");

        let res = self
            .http
            .get(self.endpoint(&["v10", "finance", "quoteSummary", symbol])?)
            .query(&[("modules", modules.as_str()), ("crumb", crumb.as_str())])
            .send()
            .await
            .map_err(|err| FetchError::new(symbol, "request", err.to_string()))?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.invalidate_crumb().await;
        }

        let text = res
            .text()
            .await
            .map_err(|err| FetchError::new(symbol, "request", err.to_string()))?;

        if !status.is_success() {
            // Unknown symbols come back as 404 with a structured error body.
            if let Ok(env) = serde_json::from_str::<QuoteSummaryEnvelope>(&text) {
                if let Some(err) = env.quote_summary.error {
                    return Err(FetchError::new(symbol, "upstream", err.describe()).into());
                }
            }
            return Err(FetchError::new(symbol, "http_status", format!("HTTP {status}: {text}")).into());
        }

        let envelope = serde_json::from_str::<QuoteSummaryEnvelope>(&text)
            .map_err(|err| FetchError::new(symbol, "decode", err.to_string()))?;

        snapshot_from_envelope(symbol, envelope)
    }
}

fn snapshot_from_envelope(symbol: &str, envelope: QuoteSummaryEnvelope) -> Result<StockSnapshot> {
    let summary = envelope.quote_summary;
    if let Some(err) = summary.error {
        return Err(FetchError::new(symbol, "upstream", err.describe()).into());
    }

    let result = summary
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| FetchError::new(symbol, "no_result", "quoteSummary returned no result"))?;

    let info = flatten_modules(&result);
    Ok(snapshot_from_info(symbol, &info, Utc::now()))
}
