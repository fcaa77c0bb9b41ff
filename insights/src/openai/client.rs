use std::time::Duration;

use async_trait::async_trait;
use market::NormalizedQuote;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::InsightError;
use crate::openai::types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};
use crate::parse::parse_insight;
use crate::prompt::{SYSTEM_PROMPT, market_prompt};
use crate::provider::InsightProvider;
use crate::types::MarketInsight;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Insight provider backed by any OpenAI-compatible `chat/completions` API.
#[derive(Clone)]
pub struct OpenAiInsightClient {
    http: Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiInsightClient {
    pub fn new(url: String, api_key: String, model: String) -> Result<Self, InsightError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    fn request<'a>(&'a self, quotes: &[NormalizedQuote]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(market_prompt(quotes)),
            ],
            temperature: 0.3,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }
}

#[async_trait]
impl InsightProvider for OpenAiInsightClient {
    #[instrument(skip(self, quotes), fields(model = %self.model, quotes = quotes.len()), level = "debug")]
    async fn analyze_market(&self, quotes: &[NormalizedQuote]) -> Result<MarketInsight, InsightError> {
        if quotes.is_empty() {
            return Err(InsightError::NoMarketData);
        }

        let url = format!("{}/chat/completions", self.url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request(quotes))
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = resp.json().await?;
        let content = body
            .first_content()
            .ok_or_else(|| InsightError::InvalidResponse("no choices in completion".into()))?;

        debug!(reply_len = content.len(), "insight completion received");

        parse_insight(content, quotes)
    }
}
