use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured commentary shown on the dashboard's insight card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInsight {
    pub title: String,
    pub content: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    /// Horizon the insight applies to, e.g. `short-term`.
    pub timeframe: String,
    /// Upper-case tickers the insight talks about.
    pub related_assets: Vec<String>,
    pub actionable: bool,
    pub generated_at: DateTime<Utc>,
}
