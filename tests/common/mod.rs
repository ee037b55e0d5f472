//! Shared test helpers: canned Chat Completions bodies and event capture.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use medic::agent_loop::{Notification, RunEvent, RunEventSink};

/// A Chat Completions response carrying only text.
pub fn text_completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17 }
    })
}

/// A Chat Completions response requesting one tool call.
pub fn tool_call_completion(id: &str, name: &str, args: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": { "name": name, "arguments": args.to_string() }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": { "prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28 }
    })
}

pub type Captured = Arc<Mutex<Vec<RunEvent>>>;

pub fn capture_events() -> (RunEventSink, Captured) {
    let events: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let sink: RunEventSink = Arc::new(move |event: RunEvent| {
        sink_events.lock().unwrap().push(event);
    });
    (sink, events)
}

pub fn payloads(events: &Captured) -> Vec<Notification> {
    events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.payload.clone())
        .collect()
}
