//! Sentence-analysis provider trait and types
//!
//! The provider returns the model's completion verbatim; turning it into
//! correction records is the parser's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request for utterance analysis
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// The transcribed or typed utterance to correct
    pub utterance: String,
    /// Optional system prompt override
    pub system_prompt: Option<String>,
    /// Max tokens to generate
    pub max_tokens: Option<u32>,
}

impl AnalysisRequest {
    pub fn new(utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            system_prompt: None,
            max_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Response from analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Raw completion text, fed to the response parser as-is
    pub content: String,
    /// Model used for the completion
    pub model: Option<String>,
    /// Token usage information
    pub usage: Option<TokenUsage>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for analysis providers
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Analyze an utterance and return the raw completion
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
