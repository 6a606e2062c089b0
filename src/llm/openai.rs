//! OpenAI-compatible chat-completions provider over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, LlmProvider, Role, ToolCall, ToolCompletionRequest, ToolCompletionResponse,
    ToolDefinition,
};

const PROVIDER: &str = "openai";

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, api_key: SecretString, model: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    async fn post(&self, body: Value) -> Result<Value, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        info!(model = %self.model, url = %url, "Calling LLM API");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = resp.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            error!(status = %status, "Provider API error: {}", truncate(&text, 500));
            return Err(classify_status(status.as_u16(), &text, retry_after, &self.model));
        }

        debug!("Provider response: {}", truncate(&text, 2000));
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        let body = build_body(&self.model, &request.messages, &request.tools);
        let data = self.post(body).await?;
        parse_response(&data)
    }
}

fn classify_status(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
    model: &str,
) -> LlmError {
    let provider = PROVIDER.to_string();
    match status {
        401 | 403 => LlmError::AuthFailed { provider },
        404 => LlmError::ModelNotAvailable {
            provider,
            model: model.to_string(),
        },
        408 => LlmError::RequestFailed {
            provider,
            reason: "request timed out".to_string(),
        },
        429 => LlmError::RateLimited {
            provider,
            retry_after,
        },
        500..=599 => LlmError::ServerError {
            provider,
            status,
            reason: truncate(body, 300).to_string(),
        },
        _ => LlmError::InvalidResponse {
            provider,
            reason: format!("status {status}: {}", truncate(body, 300)),
        },
    }
}

/// Truncate for logging without splitting a UTF-8 character.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn message_to_json(msg: &ChatMessage) -> Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut out = json!({ "role": role, "content": msg.content });
    if !msg.tool_calls.is_empty() {
        out["tool_calls"] = Value::Array(
            msg.tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect(),
        );
    }
    if let Some(id) = &msg.tool_call_id {
        out["tool_call_id"] = json!(id);
    }
    out
}

fn build_body(model: &str, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages.iter().map(message_to_json).collect::<Vec<_>>(),
    });
    if !tools.is_empty() {
        body["tools"] = Value::Array(
            tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect(),
        );
    }
    body
}

/// Read content, tool calls, and usage out of a chat-completions response.
///
/// Usage comes only from `usage.prompt_tokens` / `usage.completion_tokens`;
/// a response without them reports zero.
fn parse_response(data: &Value) -> Result<ToolCompletionResponse, LlmError> {
    let message = data["choices"]
        .get(0)
        .map(|c| &c["message"])
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: "no choices in response".to_string(),
        })?;

    let content = message["content"].as_str().map(str::to_string);

    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .map(|tc| {
                    let raw = tc["function"]["arguments"].as_str().unwrap_or("{}");
                    ToolCall {
                        id: tc["id"].as_str().unwrap_or_default().to_string(),
                        name: tc["function"]["name"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                        arguments: serde_json::from_str(raw).unwrap_or_else(|_| json!({})),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let usage = &data["usage"];
    Ok(ToolCompletionResponse {
        content,
        tool_calls,
        input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
    })
}
