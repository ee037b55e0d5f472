//! Step events and user-facing run notifications.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::types::{ModelMessage, ToolResult};

use super::types::{RunId, ToolInvocation};

/// Internal event produced by the step engine.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    /// A reasoning step finished. `pending` is the tool call the engine
    /// will act on when resumed, if any.
    Reasoned {
        message: ModelMessage,
        pending: Option<ToolInvocation>,
    },
    /// An acting step finished.
    ToolExecuted { result: ToolResult },
}

/// Who a projected turn is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TurnRole {
    Agent,
    Supervisor,
    System,
    Intervention,
    Failure,
}

/// Discrete notification handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Clear,
    Running {
        value: bool,
    },
    Paused {
        value: bool,
    },
    Turn {
        role: TurnRole,
        content: String,
    },
    ApprovalRequest {
        tool_name: String,
        args_text: String,
    },
    ToolResult {
        tool_name: String,
        content: String,
        is_error: bool,
    },
}

impl Notification {
    pub fn turn(role: TurnRole, content: impl Into<String>) -> Self {
        Self::Turn {
            role,
            content: content.into(),
        }
    }
}

/// Envelope for run notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: Notification,
}

/// Receives every notification of a run, in emission order.
pub type RunEventSink = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Stamps notifications with the run id and a strictly increasing sequence.
///
/// The driver and the control surface share one emitter; the sequence lock
/// is held across delivery so sequence order is delivery order.
#[derive(Clone)]
pub(crate) struct RunEventEmitter {
    run_id: RunId,
    seq: Arc<Mutex<u64>>,
    sink: Option<RunEventSink>,
}

impl RunEventEmitter {
    pub(crate) fn new(run_id: RunId, sink: Option<RunEventSink>) -> Self {
        Self {
            run_id,
            seq: Arc::new(Mutex::new(1)),
            sink,
        }
    }

    pub(crate) fn emit(&self, payload: Notification) {
        let Some(sink) = &self.sink else {
            return;
        };
        let mut next = self.seq.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = *next;
        *next += 1;
        (sink)(RunEvent {
            run_id: self.run_id,
            seq,
            timestamp: Utc::now(),
            payload,
        });
    }

    pub(crate) fn turn(&self, role: TurnRole, content: impl Into<String>) {
        self.emit(Notification::turn(role, content));
    }
}
