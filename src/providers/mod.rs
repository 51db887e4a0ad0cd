//! Provider abstraction layer for transcription and analysis services
//!
//! Both services live behind traits so a fake can be injected in tests and
//! the core flow never depends on a concrete vendor.
mod analysis;
mod gateway;
mod openai;
mod transcription;

pub use analysis::{AnalysisProvider, AnalysisRequest, AnalysisResponse, TokenUsage};
pub use gateway::GatewayAnalysisProvider;
pub use openai::{OpenAIAnalysisProvider, OpenAITranscriptionProvider};
pub use transcription::{TranscriptionProvider, TranscriptionRequest, TranscriptionResponse};
