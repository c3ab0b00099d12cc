pub mod gemini;
pub mod models;
pub mod openai;

use gemini::GeminiProvider;
use openai::OpenAiProvider;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use models::{GenerationRequest, GenerationResponse};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing Credential: {0}")]
    MissingCredential(String),
    #[error("Network Error: {0}")]
    Network(String),
    #[error("API Error: {0}")]
    Api(String),
    #[error("Invalid Response")]
    InvalidResponse,
    #[error("Rate Limited")]
    RateLimited,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Sends one request and waits for the whole reply.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Builds the provider named by `llm.provider`.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_default(config: &AppConfig) -> Option<Arc<dyn LlmProvider>> {
        match config.llm.provider.as_str() {
            "gemini" => {
                let cfg = &config.llm.gemini;
                Some(Arc::new(GeminiProvider::new(
                    cfg.api_key.clone(),
                    cfg.api_base.clone(),
                    cfg.model.clone(),
                )))
            }
            "openai" => {
                let cfg = &config.llm.openai;
                Some(Arc::new(OpenAiProvider::new(
                    cfg.api_key.clone(),
                    cfg.api_base.clone(),
                    cfg.model.clone(),
                )))
            }
            _ => None,
        }
    }
}
