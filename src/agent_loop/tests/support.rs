use super::*;

use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::provider::{ModelProvider, ProviderRequest};
use crate::tools::{AgentToolParameters, Tool, ToolArguments, ToolExecutionContext, ToolRegistry};
use crate::types::ToolCall;

/// Replays canned replies in order and records every request.
pub(super) struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ModelReply, MedicError>>>,
    pub(super) requests: Mutex<Vec<ProviderRequest>>,
    /// (entered, release) for the first call only.
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl ScriptedProvider {
    pub(super) fn new(replies: Vec<Result<ModelReply, MedicError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        })
    }

    /// Like `new`, but the first call signals `entered` and then blocks
    /// until `release` is notified.
    pub(super) fn gated(
        replies: Vec<Result<ModelReply, MedicError>>,
    ) -> (Arc<Self>, Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let provider = Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            gate: Mutex::new(Some((entered.clone(), release.clone()))),
        });
        (provider, entered, release)
    }

    pub(super) fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub(super) fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().expect("requests lock")[index].clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn invoke(&self, request: &ProviderRequest) -> Result<ModelReply, MedicError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        let gate = self.gate.lock().expect("gate lock").take();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Ok(ModelReply::text("nothing left to say")))
    }
}

/// Counts executions and teardowns.
pub(super) struct TrackedTool {
    name: String,
    params: AgentToolParameters,
    pub(super) executions: AtomicUsize,
    pub(super) teardowns: AtomicUsize,
}

impl TrackedTool {
    pub(super) fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            params: AgentToolParameters::object()
                .string("command", "Command to run", true)
                .build(),
            executions: AtomicUsize::new(0),
            teardowns: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Tool for TrackedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "records calls"
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.params
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        _ctx: &ToolExecutionContext,
    ) -> Result<String, MedicError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(format!("ran {}", args.get_str("command")?))
    }

    async fn teardown(&self) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

pub(super) type EventLog = Arc<Mutex<Vec<RunEvent>>>;

pub(super) fn capture_events() -> (RunEventSink, EventLog) {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let sink: RunEventSink = Arc::new(move |event: RunEvent| {
        sink_events.lock().expect("event lock").push(event);
    });
    (sink, events)
}

pub(super) fn notifications(events: &EventLog) -> Vec<Notification> {
    events
        .lock()
        .expect("event lock")
        .iter()
        .map(|event| event.payload.clone())
        .collect()
}

pub(super) fn turns(events: &EventLog, role: TurnRole) -> Vec<String> {
    notifications(events)
        .into_iter()
        .filter_map(|n| match n {
            Notification::Turn { role: r, content } if r == role => Some(content),
            _ => None,
        })
        .collect()
}

pub(super) fn test_context() -> DiagnosticContext {
    DiagnosticContext::new("error: linker `cc` not found", "/work/app")
        .with_command_history("cargo build")
}

pub(super) fn shell_call(command: &str) -> ToolCall {
    ToolCall {
        id: "call-shell".to_string(),
        name: "shell".to_string(),
        arguments: serde_json::json!({ "command": command }),
    }
}

/// Driver over `provider` with one tracked ordinary tool (`probe`) and one
/// tracked privileged tool (`shell`).
pub(super) fn driver_with(
    provider: Arc<ScriptedProvider>,
    sink: RunEventSink,
) -> (RunDriver, Arc<TrackedTool>, Arc<TrackedTool>) {
    let probe = TrackedTool::new("probe");
    let shell = TrackedTool::new("shell");
    let tools: Vec<Arc<dyn Tool>> = vec![probe.clone(), shell.clone()];
    let registry = ToolRegistry::new(tools, ["shell".to_string()], 5000);
    let driver = RunDriver::new(
        EngineSettings::default(),
        provider,
        Arc::new(registry),
        Some(sink),
    );
    (driver, probe, shell)
}

pub(super) async fn wait_until(what: &str, check: impl Fn() -> bool) {
    let polled = timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}
