//! OpenAI provider implementations for Whisper transcription and tutor analysis

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, Result};

use super::analysis::TokenUsage;
use super::{
    AnalysisProvider, AnalysisRequest, AnalysisResponse, TranscriptionProvider,
    TranscriptionRequest, TranscriptionResponse,
};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Contract the tutor model is held to: a flat JSON array, one entry per
/// analyzed sentence, `%%` around the changed span, slash-delimited
/// rationale, and a native-language gloss in `title`.
const TUTOR_SYSTEM_PROMPT: &str = "\
You are a friendly English tutor. Analyze the user's English utterance and correct it.\n\
Split the input into sentences and analyze each one separately, returning one array entry per sentence.\n\
Respond with a JSON array in exactly this shape:\n\
[\n\
  {\n\
    \"title\": \"Korean translation of the sentence\",\n\
    \"before_versa_after_sentence\": \"original sentence / corrected sentence\",\n\
    \"before_sentence\": \"original sentence with the part to fix wrapped in %%\",\n\
    \"before_intent\": \"empathetic explanation of what the speaker meant, ending with one sentence naming what needs fixing\",\n\
    \"after_sentence\": \"corrected sentence with the changed part wrapped in %%\",\n\
    \"after_detail\": \"reason one / reason two / reason three\"\n\
  }\n\
]\n\
\n\
Rules:\n\
1. Output pure JSON with no code fences.\n\
2. Wrap every string in double quotes and escape embedded quotes.\n\
3. Every field value must be a string.\n\
4. Close every array and object.\n\
5. Never nest braces inside a record.\n\
6. The response must begin with [ and end with ].";

/// OpenAI Whisper transcription provider
pub struct OpenAITranscriptionProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAITranscriptionProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        let key = api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());

        Self {
            client: Client::new(),
            api_key: key,
            model: "whisper-1".to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[async_trait]
impl TranscriptionProvider for OpenAITranscriptionProvider {
    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse> {
        let api_key = self.api_key()?;

        // the API wants a container format, not bare PCM
        let wav_data = pcm_to_wav(&request.audio, request.sample_rate, 1);

        let file_part = reqwest::multipart::Part::bytes(wav_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Transcription(format!("Failed to create form part: {e}")))?;

        let language = request.language.unwrap_or_else(|| "en".to_string());

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("language", language)
            .text("response_format", "json");

        if let Some(prompt) = &request.prompt {
            form = form.text("prompt", prompt.clone());
        }

        debug!("Sending transcription request to OpenAI Whisper");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", OPENAI_API_BASE))
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Whisper API error: {} - {}", status, error_text);
            return Err(Error::Transcription(format!(
                "Whisper API error: {} - {}",
                status, error_text
            )));
        }

        let whisper_response: WhisperResponse = response.json().await?;

        // estimate duration from audio size if not provided
        let duration_ms = whisper_response
            .duration
            .map(|d| (d * 1000.0) as u64)
            .unwrap_or_else(|| {
                // PCM 16-bit mono at sample_rate
                let samples = request.audio.len() / 2;
                (samples as u64 * 1000) / request.sample_rate.max(1) as u64
            });

        Ok(TranscriptionResponse {
            text: whisper_response.text,
            language: whisper_response.language,
            duration_ms,
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI chat-based tutor analysis provider
pub struct OpenAIAnalysisProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAIAnalysisProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        let key = api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());

        Self {
            client: Client::new(),
            api_key: key,
            model: "gpt-4o".to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl AnalysisProvider for OpenAIAnalysisProvider {
    fn name(&self) -> &'static str {
        "OpenAI GPT"
    }

    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse> {
        let api_key = self.api_key()?;

        let system_prompt = request
            .system_prompt
            .unwrap_or_else(|| TUTOR_SYSTEM_PROMPT.to_string());

        let chat_request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Analyze the following English utterance: \"{}\"",
                        request.utterance
                    ),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: 0.3, // low temperature for stable JSON output
        };

        debug!("Sending analysis request to OpenAI");

        let response = self
            .client
            .post(format!("{}/chat/completions", OPENAI_API_BASE))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error: {} - {}", status, error_text);
            return Err(Error::Analysis(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Analysis("No completion returned".to_string()))?;

        Ok(AnalysisResponse {
            content,
            model: Some(chat_response.model),
            usage: chat_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Convert raw PCM data to WAV format
fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample) / 8;
    let block_align = channels * bits_per_sample / 8;
    let data_size = pcm.len() as u32;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(44 + pcm.len());

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&file_size.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(pcm);

    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_to_wav() {
        // 1 second of silence at 16kHz mono
        let pcm = vec![0u8; 32000]; // 16000 samples * 2 bytes
        let wav = pcm_to_wav(&pcm, 16000, 1);

        // check RIFF header
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        // total size should be 44 header + 32000 data
        assert_eq!(wav.len(), 44 + 32000);
    }

    #[test]
    fn test_tutor_prompt_states_the_output_contract() {
        assert!(TUTOR_SYSTEM_PROMPT.contains("JSON array"));
        assert!(TUTOR_SYSTEM_PROMPT.contains("%%"));
        assert!(TUTOR_SYSTEM_PROMPT.contains("after_detail"));
        assert!(TUTOR_SYSTEM_PROMPT.contains("Never nest braces"));
    }

    #[test]
    fn test_provider_not_configured() {
        let provider = OpenAITranscriptionProvider::new(None);
        // when OPENAI_API_KEY env var is not set, this should be false
        // but in tests the env might be set, so we just verify the method works
        let _ = provider.is_configured();
    }
}
