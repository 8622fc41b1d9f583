//! AI layer: LLM provider abstraction and the four insight operations.

pub mod insight;
pub mod provider;

pub use insight::{InsightGenerator, RepoContext};
pub use provider::{
    GenerationParams, GroqProvider, LlmProvider, LlmResponse, ProviderConfig, SharedProvider,
    TokenUsage, create_provider,
};
