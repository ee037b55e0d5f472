//! Diagnostic context: the immutable input of a run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const DEFAULT_DIRECTIVE: &str = "\
You are a senior engineer diagnosing a failure in a software project.

Project directory: {project_dir}
Recent command history:
{command_history}

Reported error:
{error}

Work step by step. Inspect the project with the tools you have before \
proposing a fix: list directories, find and read the relevant files, search \
for symbols, and look up unfamiliar errors on the web. Call at most one tool \
per reply. Shell commands need the user's approval, so explain why you need \
one before asking for it. If the user rejects an action or gives you new \
instructions, follow them. When you have found the cause, explain it and \
the fix, then stop calling tools.";

/// Error report, command history and project root for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    pub error_text: String,
    pub command_history: String,
    pub project_dir: PathBuf,
}

impl DiagnosticContext {
    pub fn new(error_text: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            error_text: error_text.into(),
            command_history: String::new(),
            project_dir: project_dir.into(),
        }
    }

    pub fn with_command_history(mut self, history: impl Into<String>) -> Self {
        self.command_history = history.into();
        self
    }

    /// The system directive for one reasoning step.
    ///
    /// `template` overrides the built-in text; blank fields render as
    /// placeholders so the model never sees an empty slot.
    pub fn system_directive(&self, template: Option<&str>) -> String {
        let project_dir = self.project_dir.display().to_string();
        template
            .unwrap_or(DEFAULT_DIRECTIVE)
            .replace("{project_dir}", or_placeholder(&project_dir, "Unknown"))
            .replace(
                "{command_history}",
                or_placeholder(&self.command_history, "No history"),
            )
            .replace("{error}", or_placeholder(&self.error_text, "No error text"))
    }

    /// First human turn of the conversation.
    pub fn initial_message(&self) -> String {
        let mut message = format!(
            "I hit an error in the project at {}:\n{}",
            self.project_dir.display(),
            self.error_text
        );
        if !self.command_history.trim().is_empty() {
            message.push_str("\n\nCommands I ran before it happened:\n");
            message.push_str(&self.command_history);
        }
        message
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}
