//! Interruptible diagnostic loop: engine, suspension, driver and events.

pub mod context;
pub mod control;
pub mod conversation;
pub mod driver;
pub mod engine;
pub mod events;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;

pub use context::DiagnosticContext;
pub use control::{ApprovalDecision, ApprovalWait, ResumeSignal, SuspensionController};
pub use conversation::Conversation;
pub use driver::{RunControl, RunDriver, DEFAULT_REJECTION};
pub use engine::{EngineSettings, EventStream, StepEngine};
pub use events::{Notification, RunEvent, RunEventSink, StepEvent, TurnRole};
pub use registry::RunRegistry;
pub use types::*;
