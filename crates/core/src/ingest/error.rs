use std::fmt;

/// An upstream failure for one symbol, tagged with the step that failed.
#[derive(Debug, Clone)]
pub struct FetchError {
    pub symbol: String,
    pub stage: &'static str,
    pub detail: String,
}

impl FetchError {
    pub fn new(symbol: &str, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            stage,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stock fetch failed (symbol={}, stage={}): {}",
            self.symbol, self.stage, self.detail
        )
    }
}

impl std::error::Error for FetchError {}
