pub mod gemini;
pub mod openai;

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::llm_config::LLMProvider;
use async_trait::async_trait;
use gemini::GeminiClient;
use openai::OpenAIClient;

/// One logical operation against the hosted completion service: a text
/// prompt in, a text response out. No streaming, no structured output mode.
#[async_trait]
pub trait CompletionClient {
    async fn complete(&self, config: &LLMConfig, prompt: &str) -> Result<String>;
}

pub struct RouterClient {
    openai: OpenAIClient,
    gemini: GeminiClient,
}

impl RouterClient {
    pub fn new() -> Self {
        Self {
            openai: OpenAIClient::new(),
            gemini: GeminiClient::new(),
        }
    }
}

impl Default for RouterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for RouterClient {
    async fn complete(&self, config: &LLMConfig, prompt: &str) -> Result<String> {
        match config.provider {
            LLMProvider::Gemini => self.gemini.complete(config, prompt).await,
            _ => self.openai.complete(config, prompt).await,
        }
    }
}
