use std::fmt::Write;

use market::NormalizedQuote;

pub const SYSTEM_PROMPT: &str = "You are a concise DeFi market analyst. \
Reply with a single JSON object and nothing else, using the keys \
title (string), content (string, at most 3 sentences), confidence (number 0..1), \
timeframe (one of \"short-term\", \"medium-term\", \"long-term\"), \
relatedAssets (array of tickers), actionable (boolean).";

/// Renders the user prompt: one line per quote, biggest market cap first.
pub fn market_prompt(quotes: &[NormalizedQuote]) -> String {
    let mut sorted: Vec<&NormalizedQuote> = quotes.iter().collect();
    sorted.sort_by(|a, b| b.market_cap_usd.total_cmp(&a.market_cap_usd));

    let mut out = String::from("Current market snapshot (USD):\n");
    for q in sorted {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "- {} ({}): price {:.4}, 24h change {:+.2}%, 24h volume {:.0}, market cap {:.0}",
            q.symbol, q.name, q.price_usd, q.change_24h_pct, q.volume_24h_usd, q.market_cap_usd
        );
    }
    out.push_str("Give one insight a portfolio holder can use today.");
    out
}
