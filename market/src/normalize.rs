//! Symbol clean-up shared by providers and configuration parsing.

/// Trims and upper-cases a ticker. Returns `None` for blank input.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    Some(s.to_ascii_uppercase())
}

/// Normalises a watch-list: drops blanks and duplicates, keeps first-seen order.
pub fn normalize_symbols<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for s in raw {
        if let Some(sym) = normalize_symbol(s.as_ref()) {
            if !out.contains(&sym) {
                out.push(sym);
            }
        }
    }
    out
}

/// Parses a comma separated list such as `"btc, eth,,SOL"`.
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    normalize_symbols(raw.split(','))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_symbols_are_rejected() {
        assert_eq!(normalize_symbol("   "), None);
        assert_eq!(normalize_symbol(" wbtc "), Some("WBTC".to_string()));
    }

    #[test]
    fn list_parsing_dedupes_and_keeps_order() {
        assert_eq!(
            parse_symbol_list("eth, BTC,,Eth , sol"),
            vec!["ETH".to_string(), "BTC".to_string(), "SOL".to_string()]
        );
    }
}
