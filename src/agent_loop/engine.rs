//! Agent step engine: the REASON/ACT state machine.
//!
//! `start` and `resume` each hand out a fresh lazy event stream rooted at
//! the current conversation. A stream runs until the engine reaches an
//! interrupt point (a reply was produced) and then ends; the caller decides
//! whether and how to resume. Starting a new stream supersedes the old one,
//! which ends without producing further events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{MedicError, Result};
use crate::provider::{ModelProvider, ProviderRequest};
use crate::tools::{ToolExecutionContext, ToolRegistry};
use crate::types::{GenerationSettings, ModelMessage, ToolCall, ToolResult};

use super::context::DiagnosticContext;
use super::conversation::Conversation;
use super::events::StepEvent;
use super::types::{RunId, ToolInvocation};

/// Lazy, single-consumer sequence of step events.
pub type EventStream = BoxStream<'static, Result<StepEvent>>;

const NOT_EXECUTED: &str =
    "Not executed: the user stepped in before this call ran. Follow the user's next message.";
const SKIPPED_EXTRA_CALL: &str =
    "Skipped: only the first tool call of a reply is executed. Request it again if still needed.";

/// Snapshot of the settings a step engine needs.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub generation: GenerationSettings,
    /// Directive template override; see [`DiagnosticContext::system_directive`].
    pub system_prompt: Option<String>,
    pub tool_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            generation: GenerationSettings::default(),
            system_prompt: None,
            tool_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
enum EngineState {
    Idle,
    Reason,
    Act {
        invocation: ToolInvocation,
        skipped: Vec<ToolCall>,
    },
    Terminal,
}

struct EngineCore {
    state: EngineState,
    conversation: Conversation,
    context: Option<Arc<DiagnosticContext>>,
    steps: u64,
}

struct EngineShared {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<ToolRegistry>,
    settings: EngineSettings,
    core: Mutex<EngineCore>,
    live: AtomicU64,
}

pub struct StepEngine {
    run_id: RunId,
    shared: Arc<EngineShared>,
}

impl StepEngine {
    pub fn new(
        run_id: RunId,
        provider: Arc<dyn ModelProvider>,
        registry: Arc<ToolRegistry>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            run_id,
            shared: Arc::new(EngineShared {
                provider,
                registry,
                settings,
                core: Mutex::new(EngineCore {
                    state: EngineState::Idle,
                    conversation: Conversation::new(run_id),
                    context: None,
                    steps: 0,
                }),
                live: AtomicU64::new(0),
            }),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Seed the conversation with `initial_message` and start reasoning.
    pub async fn start(
        &self,
        context: DiagnosticContext,
        initial_message: impl Into<String>,
    ) -> Result<EventStream> {
        let mut core = self.shared.core.lock().await;
        if !matches!(core.state, EngineState::Idle) {
            return Err(MedicError::InvalidState("engine already started".into()));
        }
        core.context = Some(Arc::new(context));
        core.conversation.push(ModelMessage::user(initial_message))?;
        core.state = EngineState::Reason;
        Ok(self.open_stream())
    }

    /// Continue from the current state.
    ///
    /// With `Some(message)` the message becomes the next human turn right
    /// away (before the stream is polled) and any tool call still waiting
    /// to run is answered with a "not executed" result instead. With `None`
    /// a pending tool call runs; from TERMINAL the returned stream is empty.
    pub async fn resume(&self, injected: Option<String>) -> Result<EventStream> {
        let mut core = self.shared.core.lock().await;
        if matches!(core.state, EngineState::Idle) {
            return Err(MedicError::InvalidState("engine not started".into()));
        }

        match injected.filter(|m| !m.trim().is_empty()) {
            Some(message) => {
                let state = std::mem::replace(&mut core.state, EngineState::Reason);
                if let EngineState::Act { invocation, skipped } = state {
                    let declined = std::iter::once(invocation.call).chain(skipped);
                    for call in declined {
                        core.conversation
                            .push(ModelMessage::tool_result(ToolResult::failure(&call, NOT_EXECUTED)))?;
                    }
                }
                core.conversation.push(ModelMessage::user(message))?;
                debug!(run_id = %self.run_id, "human turn injected");
            }
            None if matches!(core.state, EngineState::Terminal) => {
                self.shared.live.fetch_add(1, Ordering::SeqCst);
                return Ok(stream::empty().boxed());
            }
            None => {}
        }
        Ok(self.open_stream())
    }

    /// Copy of the stored conversation.
    pub async fn messages(&self) -> Vec<ModelMessage> {
        self.shared.core.lock().await.conversation.messages().to_vec()
    }

    pub async fn is_terminal(&self) -> bool {
        matches!(self.shared.core.lock().await.state, EngineState::Terminal)
    }

    fn open_stream(&self) -> EventStream {
        let generation = self.shared.live.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        Box::pin(async_stream::try_stream! {
            while shared.live.load(Ordering::SeqCst) == generation {
                let Some(event) = shared.step().await? else {
                    break;
                };
                let interrupt = matches!(event, StepEvent::Reasoned { .. });
                yield event;
                if interrupt {
                    break;
                }
            }
        })
    }
}

impl EngineShared {
    /// Advance one node. `None` when there is nothing left to do.
    async fn step(&self) -> Result<Option<StepEvent>> {
        let mut core = self.core.lock().await;
        match std::mem::replace(&mut core.state, EngineState::Terminal) {
            EngineState::Reason => self.reason(&mut core).await.map(Some),
            EngineState::Act { invocation, skipped } => {
                self.act(&mut core, invocation, skipped).await.map(Some)
            }
            state @ (EngineState::Idle | EngineState::Terminal) => {
                core.state = state;
                Ok(None)
            }
        }
    }

    async fn reason(&self, core: &mut EngineCore) -> Result<StepEvent> {
        // A failed model call leaves the engine ready to reason again.
        core.state = EngineState::Reason;
        core.steps += 1;
        let context = core
            .context
            .clone()
            .ok_or_else(|| MedicError::InvalidState("no diagnostic context".into()))?;

        let request = ProviderRequest {
            system: context.system_directive(self.settings.system_prompt.as_deref()),
            messages: core.conversation.messages().to_vec(),
            tools: self.registry.definitions(),
            settings: self.settings.generation.clone(),
        };
        debug!(
            run_id = %core.conversation.run_id(),
            step = core.steps,
            messages = request.messages.len(),
            "reasoning"
        );
        let reply = self.provider.invoke(&request).await?;

        let mut calls: Vec<ToolCall> = reply
            .tool_calls
            .into_iter()
            .map(|mut call| {
                if call.id.trim().is_empty() {
                    call.id = format!("call_{}", Uuid::new_v4().simple());
                }
                call
            })
            .collect();

        let message = ModelMessage::assistant_with_calls(reply.text, calls.clone());
        core.conversation.push(message.clone())?;

        let pending = if calls.is_empty() {
            core.state = EngineState::Terminal;
            None
        } else {
            let first = calls.remove(0);
            let invocation = ToolInvocation {
                risk: self.registry.classify(&first.name),
                call: first,
            };
            if !calls.is_empty() {
                debug!(extra = calls.len(), "only the first tool call will run");
            }
            core.state = EngineState::Act {
                invocation: invocation.clone(),
                skipped: calls,
            };
            Some(invocation)
        };

        Ok(StepEvent::Reasoned { message, pending })
    }

    async fn act(
        &self,
        core: &mut EngineCore,
        invocation: ToolInvocation,
        skipped: Vec<ToolCall>,
    ) -> Result<StepEvent> {
        let working_dir = core
            .context
            .as_ref()
            .map(|c| c.project_dir.clone())
            .unwrap_or_default();
        let ctx = ToolExecutionContext {
            default_timeout: self.settings.tool_timeout,
            ..ToolExecutionContext::new(working_dir)
        };

        debug!(
            run_id = %core.conversation.run_id(),
            tool = %invocation.call.name,
            risk = %invocation.risk,
            "acting"
        );
        let result = self.registry.dispatch(&invocation.call, &ctx).await;
        core.conversation.push(ModelMessage::tool_result(result.clone()))?;
        for call in &skipped {
            core.conversation
                .push(ModelMessage::tool_result(ToolResult::failure(call, SKIPPED_EXTRA_CALL)))?;
        }
        core.state = EngineState::Reason;

        Ok(StepEvent::ToolExecuted { result })
    }
}
