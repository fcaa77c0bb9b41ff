use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from market provider: {0}")]
    InvalidResponse(String),

    #[error("no symbols requested")]
    NoSymbols,

    #[error("market provider unavailable: {0}")]
    Unavailable(String),
}
