//! Convenience re-exports for common use.

pub use crate::agent_loop::{
    DiagnosticContext, Notification, RunControl, RunDriver, RunEvent, RunEventSink, RunOutcome,
    RunRegistry, RunResult, RunStatus, TurnRole,
};
pub use crate::config::MedicConfig;
pub use crate::error::{MedicError, Result};
pub use crate::provider::{ModelProvider, OpenAiProvider};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments, ToolRegistry};
pub use crate::types::{ContentPart, GenerationSettings, ModelMessage, Role, ToolCall, ToolResult};
