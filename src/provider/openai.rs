//! OpenAI-compatible Chat Completions provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::AgentSection;
use crate::error::MedicError;
use crate::types::*;

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{ModelProvider, ModelReply, ProviderRequest};

/// Talks to any endpoint exposing `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(model: impl Into<String>, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(agent: &AgentSection) -> Self {
        Self::new(agent.model.clone(), agent.api_key.clone(), agent.api_url.clone())
    }

    fn build_request_body(&self, request: &ProviderRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(json!({ "role": "system", "content": request.system }));
        messages.extend(request.messages.iter().map(message_to_openai));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(max) = request.settings.max_tokens {
                obj.insert("max_tokens".into(), max.into());
            }
            if let Some(temp) = request.settings.temperature {
                obj.insert("temperature".into(), temp.into());
            }
            if let Some(top_p) = request.settings.top_p {
                obj.insert("top_p".into(), top_p.into());
            }
            if let Some(seed) = request.settings.seed {
                obj.insert("seed".into(), seed.into());
            }
            if !request.tools.is_empty() {
                let tool_defs: Vec<Value> = request
                    .tools
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
                    .collect();
                obj.insert("tools".into(), tool_defs.into());
            }
        }

        body
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, request: &ProviderRequest) -> Result<ModelReply, MedicError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, messages = request.messages.len(), "chat completion");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(self.api_key.as_deref()))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        let data: OpenAiChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| MedicError::api(status.as_u16(), "No choices in chat completion response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id.unwrap_or_default(),
                name: tc.function.name,
                arguments: parse_arguments(&tc.function.arguments),
            })
            .collect();

        Ok(ModelReply {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: data
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
            finish_reason: choice.finish_reason.as_deref().and_then(|s| s.parse().ok()),
        })
    }
}

/// Arguments arrive as a JSON-encoded string. Unparseable text is kept as a
/// string so validation can report it to the model.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn message_to_openai(msg: &ModelMessage) -> Value {
    if let Some(tr) = msg.tool_result_part() {
        return json!({
            "role": "tool",
            "tool_call_id": tr.tool_call_id,
            "content": tr.content,
        });
    }

    let text = msg.text();
    let tool_calls = msg.tool_calls();
    if !tool_calls.is_empty() {
        let tc_json: Vec<Value> = tool_calls
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
            .collect();
        return json!({
            "role": "assistant",
            "content": if text.is_empty() { Value::Null } else { Value::String(text) },
            "tool_calls": tc_json,
        });
    }

    json!({ "role": msg.role.to_string(), "content": text })
}

// Chat Completions response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: Option<String>,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
