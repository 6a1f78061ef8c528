//! OpenAiCompletionClient - Direct REST client for the OpenAI Chat Completions API.
//!
//! Makes exactly one request per call; retries are layered on top by
//! [`RetryingCompletion`](crate::RetryingCompletion).

use async_trait::async_trait;
use parley_core::completion::{CompletionService, ServiceError};
use parley_core::config::{AssistantConfig, DEFAULT_MODEL, OpenAiSecret};
use parley_core::conversation::ConversationTurn;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Completion client that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl OpenAiCompletionClient {
    /// Creates a client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Builds a client from resolved credentials and tunables.
    ///
    /// The model named in the secret file takes precedence over the config.
    pub fn from_config(secret: &OpenAiSecret, config: &AssistantConfig) -> Result<Self, ServiceError> {
        let model = secret
            .model_name
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| config.model.clone());

        let mut agent = Self::new(secret.api_key.clone(), model)
            .with_timeout(config.request_timeout())?
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature);
        if let Some(url) = &secret.base_url {
            agent = agent.with_endpoint(url.clone());
        }
        Ok(agent)
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the client at an OpenAI-compatible chat completions endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Rebuilds the HTTP client with a whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ServiceError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ServiceError::Unavailable(format!("Failed to build HTTP client: {err}")))?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, turns: &'a [ConversationTurn]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: turns
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role().as_str(),
                    content: turn.content(),
                })
                .collect(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    async fn send_request(&self, body: &ChatCompletionRequest<'_>) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let body_text = response.text().await.map_err(map_transport_error)?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body_text)
            .map_err(|err| ServiceError::Malformed(format!("Failed to parse OpenAI response: {err}")))?;

        extract_text_response(parsed)
    }
}

impl Default for OpenAiCompletionClient {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_MODEL)
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionClient {
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String, ServiceError> {
        if self.api_key.trim().is_empty() {
            return Err(ServiceError::Unavailable("OpenAI API key is not configured".into()));
        }
        if turns.is_empty() {
            return Err(ServiceError::Malformed("No turns to send".into()));
        }

        let request = self.build_request(turns);
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, ServiceError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(ServiceError::EmptyResponse)
}

fn map_transport_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Transport {
        message: format!("OpenAI API request failed: {err}"),
        is_retryable: err.is_connect() || err.is_timeout(),
    }
}

fn map_http_error(status: StatusCode, body: String) -> ServiceError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    ServiceError::Status {
        status: status.as_u16(),
        message,
        is_retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_payload_shape() {
        let client = OpenAiCompletionClient::new("key", "gpt-4o-mini")
            .with_max_tokens(1500)
            .with_temperature(0.5);
        let turns = vec![
            ConversationTurn::system("be nice"),
            ConversationTurn::user("hello"),
        ];

        let value = serde_json::to_value(client.build_request(&turns)).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["max_tokens"], 1500);
        assert_eq!(value["temperature"], 0.5);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let client = OpenAiCompletionClient::new("key", "m");
        let turns = vec![ConversationTurn::user("x")];
        let value = serde_json::to_value(client.build_request(&turns)).unwrap();
        assert!(value.get("max_tokens").is_none());
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_extract_trims_content() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "  hi there \n"}}]}"#).unwrap();
        assert_eq!(extract_text_response(parsed).unwrap(), "hi there");
    }

    #[test]
    fn test_extract_rejects_empty_and_missing_content() {
        for body in [
            r#"{"choices": []}"#,
            r#"{"choices": [{"message": {"content": null}}]}"#,
            r#"{"choices": [{"message": {"content": "   "}}]}"#,
            r#"{}"#,
        ] {
            let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
            assert_eq!(extract_text_response(parsed), Err(ServiceError::EmptyResponse), "{body}");
        }
    }

    #[test]
    fn test_http_error_mapping() {
        let err = map_http_error(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error": {"message": "overloaded", "type": "server_error"}}"#.to_string(),
        );
        assert_eq!(
            err,
            ServiceError::Status {
                status: 503,
                message: "overloaded".into(),
                is_retryable: true,
            }
        );

        let err = map_http_error(StatusCode::UNAUTHORIZED, "plain text".to_string());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("plain text"));
    }

    #[test]
    fn test_secret_model_overrides_config() {
        let secret = OpenAiSecret {
            api_key: "k".into(),
            model_name: Some("gpt-4o".into()),
            base_url: Some("http://localhost:9/v1/chat/completions".into()),
        };
        let client = OpenAiCompletionClient::from_config(&secret, &AssistantConfig::default()).unwrap();
        assert_eq!(client.model(), "gpt-4o");
        assert_eq!(client.endpoint, "http://localhost:9/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let client = OpenAiCompletionClient::default();
        let err = client.complete(&[ConversationTurn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }
}
