use market::MarketError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("market data unavailable: {0}")]
    Market(#[from] MarketError),

    #[error("invalid holding `{0}`: expected SYMBOL:AMOUNT")]
    InvalidHolding(String),

    #[error("portfolio service unavailable: {0}")]
    Unavailable(String),
}
