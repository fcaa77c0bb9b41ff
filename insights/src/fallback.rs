use chrono::Utc;
use market::NormalizedQuote;

use crate::types::MarketInsight;

/// Canned insight shown while the AI provider has never answered.
///
/// Mentions the biggest 24h mover when quotes are available so the card is
/// still grounded in live data.
pub fn fallback_insight(quotes: &[NormalizedQuote]) -> MarketInsight {
    let mover = quotes
        .iter()
        .max_by(|a, b| a.change_24h_pct.abs().total_cmp(&b.change_24h_pct.abs()));

    let (content, related_assets) = match mover {
        Some(q) => (
            format!(
                "AI analysis is temporarily unavailable. Biggest 24h mover: {} ({:+.2}%).",
                q.symbol, q.change_24h_pct
            ),
            vec![q.symbol.clone()],
        ),
        None => (
            "AI analysis is temporarily unavailable. Market data will refresh shortly.".to_string(),
            Vec::new(),
        ),
    };

    MarketInsight {
        title: "Market update".to_string(),
        content,
        confidence: 0.0,
        timeframe: "short-term".to_string(),
        related_assets,
        actionable: false,
        generated_at: Utc::now(),
    }
}
