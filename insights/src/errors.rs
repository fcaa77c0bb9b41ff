use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from insight provider: {0}")]
    InvalidResponse(String),

    #[error("insight reply is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no market data to analyze")]
    NoMarketData,

    #[error("insight provider unavailable: {0}")]
    Unavailable(String),
}
