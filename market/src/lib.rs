//! Market-data collaborator for the dashboard coordinator.
//!
//! Exposes the provider trait the coordinator depends on, the normalized
//! quote model, and a CoinGecko-backed HTTP implementation.

pub mod coingecko;
pub mod errors;
pub mod normalize;
pub mod provider;
pub mod types;

pub use coingecko::CoinGeckoClient;
pub use errors::MarketError;
pub use provider::MarketDataProvider;
pub use types::NormalizedQuote;
