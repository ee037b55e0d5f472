//! Suspension controller: run status plus the approval and pause waiters.
//!
//! Each waiter is a `oneshot` pair. The driver owns the receiving half
//! while it is suspended; control signals resolve the sending half exactly
//! once. No state is polled across the boundary.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::types::RunStatus;

/// Supervisor verdict on a privileged tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject { feedback: Option<String> },
}

/// What the driver learns from an approval wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalWait {
    Decided(ApprovalDecision),
    Stopped,
    /// A pause landed before the gate was reached. Service it, then wait
    /// for approval again.
    PausePending,
}

/// What the driver learns from a pause wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeSignal {
    Continue,
    Intervene(String),
    Stop,
}

#[derive(Debug)]
enum ApprovalSignal {
    Decision(ApprovalDecision),
    Stop,
}

#[derive(Debug)]
struct Slots {
    status: RunStatus,
    approval: Option<oneshot::Sender<ApprovalSignal>>,
    pause_tx: Option<oneshot::Sender<ResumeSignal>>,
    /// Parked until the driver reaches a checkpoint, so a resume sent
    /// before that is not lost.
    pause_rx: Option<oneshot::Receiver<ResumeSignal>>,
}

/// One per run. Never shared between runs.
#[derive(Debug)]
pub struct SuspensionController {
    slots: Mutex<Slots>,
}

impl Default for SuspensionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspensionController {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                status: RunStatus::Running,
                approval: None,
                pause_tx: None,
                pause_rx: None,
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> RunStatus {
        self.slots().status
    }

    pub fn is_stopped(&self) -> bool {
        self.status() == RunStatus::Stopped
    }

    pub fn approval_pending(&self) -> bool {
        self.slots().approval.is_some()
    }

    /// RUNNING → PAUSED. Ignored unless running with no wait outstanding.
    pub fn request_pause(&self) -> bool {
        let mut slots = self.slots();
        if slots.status != RunStatus::Running
            || slots.approval.is_some()
            || slots.pause_rx.is_some()
        {
            return false;
        }
        let (tx, rx) = oneshot::channel();
        slots.pause_tx = Some(tx);
        slots.pause_rx = Some(rx);
        slots.status = RunStatus::Paused;
        tracing::debug!("pause requested");
        true
    }

    /// PAUSED → RUNNING, carrying an intervention when `message` is
    /// non-blank. Ignored when not paused.
    pub fn request_resume(&self, message: Option<String>) -> bool {
        let mut slots = self.slots();
        if slots.status != RunStatus::Paused {
            return false;
        }
        let Some(tx) = slots.pause_tx.take() else {
            return false;
        };
        let signal = match message.filter(|m| !m.trim().is_empty()) {
            Some(message) => ResumeSignal::Intervene(message),
            None => ResumeSignal::Continue,
        };
        tracing::debug!(intervene = matches!(signal, ResumeSignal::Intervene(_)), "resume requested");
        let _ = tx.send(signal);
        slots.status = RunStatus::Running;
        true
    }

    /// Resolve the outstanding approval wait. Ignored when none is pending.
    pub fn request_approval(&self, decision: ApprovalDecision) -> bool {
        let Some(tx) = self.slots().approval.take() else {
            return false;
        };
        tracing::debug!(?decision, "approval decided");
        tx.send(ApprovalSignal::Decision(decision)).is_ok()
    }

    pub fn approve(&self) -> bool {
        self.request_approval(ApprovalDecision::Approve)
    }

    pub fn reject(&self, feedback: Option<String>) -> bool {
        let feedback = feedback.filter(|f| !f.trim().is_empty());
        self.request_approval(ApprovalDecision::Reject { feedback })
    }

    /// Move to STOPPED and release whichever waiters exist. Ignored once
    /// the run has ended.
    pub fn request_stop(&self) -> bool {
        let mut slots = self.slots();
        if matches!(slots.status, RunStatus::Stopped | RunStatus::Finished) {
            return false;
        }
        slots.status = RunStatus::Stopped;
        if let Some(tx) = slots.approval.take() {
            let _ = tx.send(ApprovalSignal::Stop);
        }
        if let Some(tx) = slots.pause_tx.take() {
            let _ = tx.send(ResumeSignal::Stop);
        }
        tracing::debug!("stop requested");
        true
    }

    /// Suspend until the supervisor decides on a privileged call.
    pub async fn await_approval(&self) -> ApprovalWait {
        let rx = {
            let mut slots = self.slots();
            if slots.status == RunStatus::Stopped {
                return ApprovalWait::Stopped;
            }
            if slots.pause_rx.is_some() {
                return ApprovalWait::PausePending;
            }
            if slots.approval.is_some() {
                tracing::warn!("approval wait replaced an unresolved one");
            }
            let (tx, rx) = oneshot::channel();
            slots.approval = Some(tx);
            rx
        };

        match rx.await {
            Ok(ApprovalSignal::Decision(decision)) => ApprovalWait::Decided(decision),
            Ok(ApprovalSignal::Stop) | Err(_) => ApprovalWait::Stopped,
        }
    }

    /// Suspend on a requested pause. `None` when no pause is outstanding.
    pub async fn await_pause(&self) -> Option<ResumeSignal> {
        let rx = self.slots().pause_rx.take()?;
        Some(rx.await.unwrap_or(ResumeSignal::Stop))
    }

    /// Terminal cleanup: drop every waiter. A stopped run stays STOPPED,
    /// anything else becomes FINISHED.
    pub fn finish(&self) {
        let mut slots = self.slots();
        if slots.status != RunStatus::Stopped {
            slots.status = RunStatus::Finished;
        }
        slots.approval = None;
        slots.pause_tx = None;
        slots.pause_rx = None;
    }
}
