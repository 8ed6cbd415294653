//! Chat-completions gateway seam.
//!
//! Both AI-backed stages talk to an OpenAI-compatible `/chat/completions`
//! endpoint. [`ChatGateway`] is the seam: [`HttpGateway`] is the production
//! implementation, tests plug in a stub.
//!
//! The gateway does not retry and does not impose a timeout; the embedding
//! service is expected to bound each call with its own deadline.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tabex_core::{Result, TabexError};
use tracing::{debug, warn};

/// Default chat-completions endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";

/// Chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

impl Message {
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    #[must_use]
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Chat-completions response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatResponse {
    /// The first choice's message, if any.
    #[must_use]
    pub fn first_message(&self) -> Option<&ResponseMessage> {
        self.choices.first().map(|c| &c.message)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

/// Tool call payload. `arguments` is usually a JSON string but some
/// providers send an object.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Raw HTTP answer from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub status: u16,
    pub body: String,
}

impl GatewayReply {
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decode a successful reply.
    ///
    /// # Errors
    ///
    /// [`TabexError::GatewayError`] for non-success statuses and for bodies
    /// that are not a chat-completions response (body truncated).
    pub fn into_response(self) -> Result<ChatResponse> {
        if !self.is_success() {
            return Err(TabexError::gateway(self.status, &self.body));
        }
        serde_json::from_str(&self.body).map_err(|e| {
            warn!(status = self.status, error = %e, "Gateway reply is not a chat-completions response");
            TabexError::gateway(self.status, &self.body)
        })
    }
}

/// A chat-completions endpoint.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send one request and return the raw reply.
    ///
    /// Non-success statuses are returned as a reply, not as an error; only
    /// transport failures are errors.
    async fn send(&self, request: &ChatRequest) -> Result<GatewayReply>;
}

/// Connection settings for [`HttpGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub url: String,
    pub api_key: String,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Gateway over HTTPS with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    #[must_use = "creates gateway client"]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send(&self, request: &ChatRequest) -> Result<GatewayReply> {
        debug!(model = %request.model, url = %self.config.url, "Sending gateway request");

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| TabexError::GatewayUnavailable(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TabexError::GatewayUnavailable(e.to_string()))?;

        Ok(GatewayReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = ChatRequest {
            model: "google/gemini-2.5-flash".to_string(),
            messages: vec![
                Message::system("rules"),
                Message::user(MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: "extract".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:application/pdf;base64,AAAA".to_string(),
                        },
                    },
                ])),
            ],
            temperature: Some(0.0),
            max_tokens: Some(32_000),
            tools: None,
            tool_choice: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["content"], "rules");
        assert_eq!(value["messages"][1]["content"][0]["type"], "text");
        assert_eq!(value["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(
            value["messages"][1]["content"][1]["image_url"]["url"],
            "data:application/pdf;base64,AAAA"
        );
        assert!(value.get("tools").is_none(), "unset tools must be omitted");
    }

    #[test]
    fn test_reply_error_status() {
        let reply = GatewayReply {
            status: 500,
            body: "internal".to_string(),
        };
        assert!(!reply.is_success());
        assert!(matches!(
            reply.into_response(),
            Err(TabexError::GatewayError { status: 500, .. })
        ));
    }

    #[test]
    fn test_reply_success_with_foreign_body() {
        let reply = GatewayReply {
            status: 200,
            body: "<html>proxy error</html>".to_string(),
        };
        match reply.into_response() {
            Err(TabexError::GatewayError { status, body }) => {
                assert_eq!(status, 200);
                assert_eq!(body, "<html>proxy error</html>");
            }
            other => panic!("Expected gateway error, got {other:?}"),
        }
    }

    #[test]
    fn test_reply_decodes_null_content_and_tool_calls() {
        let reply = GatewayReply {
            status: 200,
            body: r#"{"choices":[{"message":{"content":null,"tool_calls":[{"function":{"name":"extract_properties","arguments":"{}"}}]}}]}"#.to_string(),
        };
        let response = reply.into_response().unwrap();
        let message = response.first_message().unwrap();
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].function.arguments, serde_json::json!("{}"));
    }

    #[test]
    fn test_gateway_config_defaults() {
        let config = GatewayConfig::new("key").with_url("http://localhost:9000/v1/chat/completions");
        assert_eq!(config.api_key, "key");
        assert!(config.url.starts_with("http://localhost"));
        assert_eq!(GatewayConfig::new("k").url, DEFAULT_GATEWAY_URL);
    }
}
