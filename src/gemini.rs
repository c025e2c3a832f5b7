use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent";

/// Sends a prompt to a generative text model and returns its raw reply.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub generation: GenerationConfig,
}

impl GeminiConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(120),
            generation: GenerationConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map(|v| v.trim().to_string())
            .map_err(|_| GatewayError::Config("GEMINI_API_KEY is not set".to_owned()))?;
        if api_key.is_empty() {
            return Err(GatewayError::Config("GEMINI_API_KEY is empty".to_owned()));
        }

        let api_url = std::env::var("GEMINI_API_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());

        let mut config = Self::new(api_url, api_key);
        if let Some(secs) = env_parse::<u64>("GEMINI_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(temperature) = env_parse::<f32>("GEMINI_TEMPERATURE")? {
            config.generation.temperature = temperature;
        }
        if let Some(top_k) = env_parse::<u32>("GEMINI_TOP_K")? {
            config.generation.top_k = top_k;
        }
        if let Some(top_p) = env_parse::<f32>("GEMINI_TOP_P")? {
            config.generation.top_p = top_p;
        }
        if let Some(max) = env_parse::<u32>("GEMINI_MAX_OUTPUT_TOKENS")? {
            config.generation.max_output_tokens = max;
        }
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, GatewayError> {
    let Some(raw) = std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| GatewayError::Config(format!("invalid {name}={raw:?}")))
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: url::Url,
    api_key: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        let mut endpoint = url::Url::parse(&config.api_url).map_err(|err| {
            GatewayError::Config(format!("invalid model API url {:?}: {err}", config.api_url))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(GatewayError::Config(format!(
                "model API url must be http(s): {}",
                config.api_url
            )));
        }
        endpoint
            .query_pairs_mut()
            .append_pair("key", &config.api_key);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            generation: config.generation,
        })
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(GeminiConfig::from_env()?)
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: self.generation,
            safety_settings: Vec::new(),
        };

        tracing::debug!(
            host = self.endpoint.host_str().unwrap_or_default(),
            prompt_chars = prompt.chars().count(),
            "call model API"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or(raw);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        extract_candidate_text(&raw)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

/// Text of the first part of the first candidate.
pub fn extract_candidate_text(raw_json: &str) -> Result<String, GatewayError> {
    let response: GenerateContentResponse = serde_json::from_str(raw_json)?;
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Envelope("no candidates in response".to_owned()))?;
    let content = candidate
        .content
        .ok_or_else(|| GatewayError::Envelope("candidate has no content".to_owned()))?;
    let part = content
        .parts
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Envelope("candidate content has no parts".to_owned()))?;
    part.text
        .ok_or_else(|| GatewayError::Envelope("first content part has no text".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_part_text() -> anyhow::Result<()> {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"hello"},{"text":"ignored"}]}}]}"#;
        assert_eq!(extract_candidate_text(raw)?, "hello");
        Ok(())
    }

    #[test]
    fn empty_candidates_is_envelope_error() {
        for raw in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{}}]}}]}"#,
        ] {
            let err = extract_candidate_text(raw).unwrap_err();
            assert!(matches!(err, GatewayError::Envelope(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn non_json_body_is_decode_error() {
        let err = extract_candidate_text("<html>").unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[test]
    fn request_body_matches_generate_content_shape() -> anyhow::Result<()> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "prompt" }],
            }],
            generation_config: GenerationConfig::default(),
            safety_settings: Vec::new(),
        };
        let value = serde_json::to_value(&body)?;
        assert_eq!(value["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(value["safetySettings"], serde_json::json!([]));
        Ok(())
    }

    #[test]
    fn error_message_comes_from_error_envelope() {
        let raw = r#"{"error":{"code":403,"message":"API key not valid"}}"#;
        assert_eq!(parse_error_message(raw).as_deref(), Some("API key not valid"));
        assert_eq!(parse_error_message("plain"), None);
    }

    #[test]
    fn client_rejects_non_http_url() {
        let err = GeminiClient::new(GeminiConfig::new("ftp://example.com/x", "k")).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
