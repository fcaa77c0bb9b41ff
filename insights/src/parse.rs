//! Turns a model reply into a validated `MarketInsight`.

use chrono::Utc;
use market::NormalizedQuote;
use serde::Deserialize;

use crate::errors::InsightError;
use crate::types::MarketInsight;

#[derive(Debug, Deserialize)]
struct RawInsight {
    title: String,
    content: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    timeframe: Option<String>,
    #[serde(default, rename = "relatedAssets", alias = "related_assets")]
    related_assets: Vec<String>,
    #[serde(default)]
    actionable: Option<bool>,
}

/// Extracts the JSON object from `reply` (models like to wrap it in a code
/// fence or prose) and validates it against the quotes it was asked about.
///
/// - confidence is clamped to `[0, 1]`, missing means `0.5`
/// - related assets are upper-cased and limited to symbols in `quotes`
pub fn parse_insight(reply: &str, quotes: &[NormalizedQuote]) -> Result<MarketInsight, InsightError> {
    let body = json_object(reply)
        .ok_or_else(|| InsightError::InvalidResponse("reply contains no json object".into()))?;

    let raw: RawInsight = serde_json::from_str(body)?;

    if raw.title.trim().is_empty() || raw.content.trim().is_empty() {
        return Err(InsightError::InvalidResponse("empty title or content".into()));
    }

    let mut related_assets: Vec<String> = Vec::new();
    for a in raw.related_assets {
        let sym = a.trim().to_ascii_uppercase();
        let known = quotes.iter().any(|q| q.symbol == sym);
        if known && !related_assets.contains(&sym) {
            related_assets.push(sym);
        }
    }

    let confidence = raw.confidence.unwrap_or(0.5);
    let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };

    Ok(MarketInsight {
        title: raw.title.trim().to_string(),
        content: raw.content.trim().to_string(),
        confidence,
        timeframe: raw
            .timeframe
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "short-term".to_string()),
        related_assets,
        actionable: raw.actionable.unwrap_or(false),
        generated_at: Utc::now(),
    })
}

fn json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}
