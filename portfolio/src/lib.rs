//! Portfolio collaborator: the trait the coordinator fetches snapshots
//! through, and a holdings-based valuation service.

pub mod errors;
pub mod holdings;
pub mod service;
pub mod types;

pub use errors::PortfolioError;
pub use holdings::{Holding, HoldingsPortfolio};
pub use service::PortfolioService;
pub use types::{AssetPosition, PortfolioSnapshot};
