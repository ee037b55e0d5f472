//! Tests for the OpenAI-compatible provider against a mock server.

mod common;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medic::error::MedicError;
use medic::provider::{ModelProvider, OpenAiProvider, ProviderRequest};
use medic::tools::{AgentToolParameters, ToolDefinition};
use medic::types::{FinishReason, GenerationSettings, ModelMessage, ToolCall, ToolResult};

use common::{text_completion, tool_call_completion};

fn request() -> ProviderRequest {
    ProviderRequest {
        system: "You diagnose errors.".to_string(),
        messages: vec![ModelMessage::user("cargo build fails")],
        tools: vec![ToolDefinition {
            name: "read_file".to_string(),
            description: "Read a file".to_string(),
            parameters: AgentToolParameters::object()
                .string("file_path", "Path", true)
                .build()
                .schema,
        }],
        settings: GenerationSettings::builder().temperature(0.0).build(),
    }
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.expect("recording enabled");
    let last = requests.last().expect("a request was sent");
    serde_json::from_slice(&last.body).expect("json body")
}

#[tokio::test]
async fn text_reply_is_parsed_with_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("Missing linker.")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("gpt-test", Some("sk-test".into()), server.uri());
    let reply = provider.invoke(&request()).await.unwrap();

    assert_eq!(reply.text, "Missing linker.");
    assert!(reply.tool_calls.is_empty());
    assert_eq!(reply.usage.total_tokens, 17);
    assert_eq!(reply.finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn system_directive_leads_and_tools_are_bound() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("ok")))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("gpt-test", None, format!("{}/", server.uri()));
    provider.invoke(&request()).await.unwrap();

    let body = last_body(&server).await;
    assert_eq!(body["model"], "gpt-test");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "You diagnose errors.");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["tools"][0]["function"]["name"], "read_file");
    assert_eq!(body["temperature"], 0.0);
}

#[tokio::test]
async fn tool_calls_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_completion(
            "call_1",
            "read_file",
            json!({ "file_path": "Cargo.toml" }),
        )))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("gpt-test", None, server.uri());
    let reply = provider.invoke(&request()).await.unwrap();

    assert_eq!(reply.text, "");
    assert_eq!(reply.tool_calls.len(), 1);
    assert_eq!(reply.tool_calls[0].id, "call_1");
    assert_eq!(reply.tool_calls[0].arguments["file_path"], "Cargo.toml");
    assert_eq!(reply.finish_reason, Some(FinishReason::ToolCalls));
}

#[tokio::test]
async fn tool_history_is_serialized_in_chat_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("done")))
        .mount(&server)
        .await;

    let call = ToolCall {
        id: "call_9".into(),
        name: "list_dir".into(),
        arguments: json!({ "dir_path": "." }),
    };
    let mut req = request();
    req.messages.push(ModelMessage::assistant_with_calls("", vec![call.clone()]));
    req.messages
        .push(ModelMessage::tool_result(ToolResult::success(&call, "[file] main.rs")));

    let provider = OpenAiProvider::new("gpt-test", None, server.uri());
    provider.invoke(&req).await.unwrap();

    let body = last_body(&server).await;
    let assistant = &body["messages"][2];
    assert_eq!(assistant["role"], "assistant");
    assert_eq!(assistant["tool_calls"][0]["id"], "call_9");
    let tool = &body["messages"][3];
    assert_eq!(tool["role"], "tool");
    assert_eq!(tool["tool_call_id"], "call_9");
    assert_eq!(tool["content"], "[file] main.rs");
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "Incorrect API key" } })),
        )
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("gpt-test", Some("bad".into()), server.uri());
    let err = provider.invoke(&request()).await.unwrap_err();
    assert!(matches!(err, MedicError::Authentication(ref m) if m.contains("Incorrect API key")));
}

#[tokio::test]
async fn server_error_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("gpt-test", None, server.uri());
    let err = provider.invoke(&request()).await.unwrap_err();
    assert!(matches!(err, MedicError::Api { status: 503, .. }));
}
