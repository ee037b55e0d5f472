//! Core run types for the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::tools::RiskClass;
use crate::types::{ModelMessage, ToolCall};

/// Unique run identifier.
pub type RunId = Uuid;

/// Run/pause/stop status of a live run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Running,
    Paused,
    Stopped,
    /// The run ended on its own.
    Finished,
}

/// A tool call the engine is about to act on, with its risk resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call: ToolCall,
    pub risk: RiskClass,
}

impl ToolInvocation {
    pub fn is_privileged(&self) -> bool {
        self.risk == RiskClass::Privileged
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Conversation state at the end of the run.
    #[serde(default)]
    pub messages: Vec<ModelMessage>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn completed(run_id: RunId, messages: Vec<ModelMessage>) -> Self {
        Self::new(run_id, RunOutcome::Completed, None, messages)
    }

    pub fn stopped(run_id: RunId, messages: Vec<ModelMessage>) -> Self {
        Self::new(run_id, RunOutcome::Stopped, None, messages)
    }

    pub fn failed(run_id: RunId, error: impl Into<String>, messages: Vec<ModelMessage>) -> Self {
        Self::new(run_id, RunOutcome::Failed, Some(error.into()), messages)
    }

    fn new(
        run_id: RunId,
        outcome: RunOutcome,
        error: Option<String>,
        messages: Vec<ModelMessage>,
    ) -> Self {
        Self {
            run_id,
            outcome,
            error,
            messages,
            finished_at: Utc::now(),
        }
    }
}
