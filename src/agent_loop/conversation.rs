//! Run-scoped conversation state.

use crate::error::{MedicError, Result};
use crate::types::{ModelMessage, Role};

use super::types::RunId;

/// Append-only message history of one run.
///
/// System directives are synthesized per reasoning step and never stored
/// here.
#[derive(Debug, Clone)]
pub struct Conversation {
    run_id: RunId,
    messages: Vec<ModelMessage>,
}

impl Conversation {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            messages: Vec::new(),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn push(&mut self, message: ModelMessage) -> Result<()> {
        if message.role == Role::System {
            return Err(MedicError::InvalidState(
                "system messages are synthesized per step and cannot be stored".into(),
            ));
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<ModelMessage> {
        self.messages
    }
}
