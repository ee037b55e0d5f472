//! Run driver: consumes engine streams, interleaves suspension checkpoints,
//! and projects notifications.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MedicConfig;
use crate::error::Result;
use crate::provider::ModelProvider;
use crate::tools::{builtin, ToolRegistry};
use crate::types::GenerationSettings;

use super::context::DiagnosticContext;
use super::control::{ApprovalDecision, ApprovalWait, ResumeSignal, SuspensionController};
use super::engine::{EngineSettings, EventStream, StepEngine};
use super::events::{Notification, RunEventEmitter, RunEventSink, StepEvent, TurnRole};
use super::types::{RunId, RunOutcome, RunResult, RunStatus, ToolInvocation};

/// Human turn fed to the model when a rejection carries no feedback.
pub const DEFAULT_REJECTION: &str = "The user rejected this action.";

enum Checkpoint {
    Proceed,
    Stop,
    Redirect(EventStream),
}

enum Gate {
    Resume(EventStream),
    Stop,
}

/// Drives one run from the initial error report to completion, stop or
/// failure.
pub struct RunDriver {
    run_id: RunId,
    engine: StepEngine,
    registry: Arc<ToolRegistry>,
    controller: Arc<SuspensionController>,
    emitter: RunEventEmitter,
}

impl RunDriver {
    pub fn new(
        settings: EngineSettings,
        provider: Arc<dyn ModelProvider>,
        registry: Arc<ToolRegistry>,
        sink: Option<RunEventSink>,
    ) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            run_id,
            engine: StepEngine::new(run_id, provider, Arc::clone(&registry), settings),
            registry,
            controller: Arc::new(SuspensionController::new()),
            emitter: RunEventEmitter::new(run_id, sink),
        }
    }

    /// Build a driver with the built-in tools, configured from a snapshot
    /// of `config`.
    pub fn from_config(
        config: &MedicConfig,
        provider: Arc<dyn ModelProvider>,
        sink: Option<RunEventSink>,
    ) -> Self {
        let registry = ToolRegistry::new(
            builtin::all_tools(&config.tools),
            config.security.privileged_tools.iter().cloned(),
            config.tools.max_output_chars,
        );
        let settings = EngineSettings {
            generation: GenerationSettings::builder()
                .temperature(config.agent.temperature)
                .maybe_max_tokens(config.agent.max_tokens)
                .build(),
            system_prompt: config.agent.system_prompt.clone(),
            tool_timeout: Duration::from_millis(config.tools.default_timeout_ms),
        };
        Self::new(settings, provider, Arc::new(registry), sink)
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Control surface for this run. Cheap to clone; usable from any task.
    pub fn control(&self) -> RunControl {
        RunControl {
            run_id: self.run_id,
            controller: Arc::clone(&self.controller),
            emitter: self.emitter.clone(),
        }
    }

    /// Run to the end. Cleanup happens on every exit path.
    pub async fn run(self, context: DiagnosticContext) -> RunResult {
        info!(
            run_id = %self.run_id,
            project_dir = %context.project_dir.display(),
            tools = self.registry.len(),
            "run started"
        );
        self.emitter.emit(Notification::Clear);
        self.emitter.emit(Notification::Running { value: true });

        let outcome = self.drive(context).await;
        if let Err(err) = &outcome {
            warn!(run_id = %self.run_id, error = %err, "run failed");
            self.emitter.turn(TurnRole::Failure, err.to_string());
        }

        self.registry.teardown().await;
        self.controller.finish();
        let messages = self.engine.messages().await;
        self.emitter.emit(Notification::Running { value: false });

        let result = match outcome {
            Ok(RunOutcome::Stopped) => RunResult::stopped(self.run_id, messages),
            Ok(_) => RunResult::completed(self.run_id, messages),
            Err(err) => RunResult::failed(self.run_id, err.to_string(), messages),
        };
        info!(run_id = %self.run_id, outcome = %result.outcome, "run finished");
        result
    }

    async fn drive(&self, context: DiagnosticContext) -> Result<RunOutcome> {
        let initial = context.initial_message();
        let mut live = self.engine.start(context, initial).await?;

        loop {
            match self.checkpoint().await? {
                Checkpoint::Proceed => {}
                Checkpoint::Stop => return Ok(RunOutcome::Stopped),
                Checkpoint::Redirect(stream) => {
                    live = stream;
                    continue;
                }
            }

            let next = live.next().await;

            // A pause that landed while pulling is handled before the
            // pulled event is projected. A redirect drops that event.
            match self.checkpoint().await? {
                Checkpoint::Proceed => {}
                Checkpoint::Stop => return Ok(RunOutcome::Stopped),
                Checkpoint::Redirect(stream) => {
                    debug!(run_id = %self.run_id, "stale step abandoned");
                    live = stream;
                    continue;
                }
            }

            let Some(event) = next else {
                return Ok(RunOutcome::Completed);
            };

            match event? {
                StepEvent::Reasoned { message, pending } => {
                    let text = message.text();
                    if !text.trim().is_empty() {
                        self.emitter.turn(TurnRole::Agent, text);
                    }
                    let Some(invocation) = pending else {
                        continue;
                    };
                    if invocation.is_privileged() {
                        self.request_approval(&invocation);
                        match self.gate(&invocation).await? {
                            Gate::Resume(stream) => live = stream,
                            Gate::Stop => return Ok(RunOutcome::Stopped),
                        }
                    } else {
                        live = self.engine.resume(None).await?;
                    }
                }
                StepEvent::ToolExecuted { result } => {
                    debug!(
                        run_id = %self.run_id,
                        tool = %result.tool_name,
                        is_error = result.is_error,
                        "tool executed"
                    );
                    self.emitter.emit(Notification::ToolResult {
                        tool_name: result.tool_name,
                        content: result.content,
                        is_error: result.is_error,
                    });
                }
            }
        }
    }

    /// Stop check, then service a parked pause if there is one.
    async fn checkpoint(&self) -> Result<Checkpoint> {
        if self.controller.is_stopped() {
            return Ok(Checkpoint::Stop);
        }
        match self.controller.await_pause().await {
            None | Some(ResumeSignal::Continue) => Ok(Checkpoint::Proceed),
            Some(ResumeSignal::Stop) => Ok(Checkpoint::Stop),
            Some(ResumeSignal::Intervene(message)) => {
                info!(run_id = %self.run_id, "intervention received");
                self.emitter.turn(
                    TurnRole::Intervention,
                    format!("Adjusting course based on your instructions: {message}"),
                );
                Ok(Checkpoint::Redirect(self.engine.resume(Some(message)).await?))
            }
        }
    }

    fn request_approval(&self, invocation: &ToolInvocation) {
        let args_text = serde_json::to_string_pretty(&invocation.call.arguments)
            .unwrap_or_else(|_| invocation.call.arguments.to_string());
        info!(run_id = %self.run_id, tool = %invocation.call.name, "awaiting approval");
        self.emitter.emit(Notification::ApprovalRequest {
            tool_name: invocation.call.name.clone(),
            args_text,
        });
    }

    async fn gate(&self, invocation: &ToolInvocation) -> Result<Gate> {
        loop {
            match self.controller.await_approval().await {
                ApprovalWait::Decided(ApprovalDecision::Approve) => {
                    info!(run_id = %self.run_id, tool = %invocation.call.name, "approved");
                    return Ok(Gate::Resume(self.engine.resume(None).await?));
                }
                ApprovalWait::Decided(ApprovalDecision::Reject { feedback }) => {
                    info!(run_id = %self.run_id, tool = %invocation.call.name, "rejected");
                    let feedback = feedback.unwrap_or_else(|| DEFAULT_REJECTION.to_string());
                    return Ok(Gate::Resume(self.engine.resume(Some(feedback)).await?));
                }
                ApprovalWait::Stopped => return Ok(Gate::Stop),
                ApprovalWait::PausePending => match self.checkpoint().await? {
                    Checkpoint::Proceed => continue,
                    Checkpoint::Stop => return Ok(Gate::Stop),
                    Checkpoint::Redirect(stream) => return Ok(Gate::Resume(stream)),
                },
            }
        }
    }
}

/// Fire-and-forget control surface of one run.
///
/// Every method is a no-op when the run is not in a state that accepts the
/// signal; the returned flag says whether it was accepted.
#[derive(Clone)]
pub struct RunControl {
    run_id: RunId,
    pub(super) controller: Arc<SuspensionController>,
    emitter: RunEventEmitter,
}

impl RunControl {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.controller.status()
    }

    pub fn approval_pending(&self) -> bool {
        self.controller.approval_pending()
    }

    pub fn approve(&self) -> bool {
        self.controller.approve()
    }

    pub fn reject(&self, feedback: Option<String>) -> bool {
        self.controller.reject(feedback)
    }

    pub fn pause(&self) -> bool {
        let accepted = self.controller.request_pause();
        if accepted {
            self.emitter.emit(Notification::Paused { value: true });
            self.emitter.turn(
                TurnRole::System,
                "Run paused. Send instructions to redirect the next step, or resume to continue.",
            );
        }
        accepted
    }

    pub fn resume(&self, message: Option<String>) -> bool {
        let accepted = self.controller.request_resume(message);
        if accepted {
            self.emitter.emit(Notification::Paused { value: false });
        }
        accepted
    }

    pub fn stop(&self) -> bool {
        let accepted = self.controller.request_stop();
        if accepted {
            self.emitter.turn(TurnRole::System, "Run stopped by the supervisor.");
        }
        accepted
    }

    /// Free-text supervisor input: rejects with feedback while an approval
    /// is pending, intervenes while paused, otherwise asks for a pause.
    pub fn submit_feedback(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() {
            return false;
        }
        self.emitter.turn(TurnRole::Supervisor, text.clone());

        if self.controller.approval_pending() {
            return self.reject(Some(text));
        }
        if self.controller.status() == RunStatus::Paused {
            return self.resume(Some(text));
        }
        self.emitter.turn(
            TurnRole::System,
            "Pause the run before sending instructions.",
        );
        false
    }
}

impl std::fmt::Debug for RunControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunControl")
            .field("run_id", &self.run_id)
            .field("status", &self.controller.status())
            .finish()
    }
}
