//! AI commentary collaborator.
//!
//! The coordinator only needs [`InsightProvider`]; the OpenAI-compatible
//! client, prompt construction and reply parsing live here as well so the
//! dashboard binary can run against a real endpoint.

pub mod errors;
pub mod fallback;
pub mod openai;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod types;

pub use errors::InsightError;
pub use fallback::fallback_insight;
pub use openai::OpenAiInsightClient;
pub use provider::InsightProvider;
pub use types::MarketInsight;
