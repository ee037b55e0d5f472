//! Terminal rendering of run notifications and parsing of control lines.

use crate::agent_loop::{Notification, RunControl, RunEvent, TurnRole};

const PREVIEW_CHARS: usize = 600;

/// A line typed by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlLine {
    Pause,
    Resume(Option<String>),
    Approve,
    Reject(Option<String>),
    Stop,
    Feedback(String),
    Empty,
}

impl ControlLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, non_blank(rest)),
            None => (line, None),
        };
        match command {
            "/pause" => Self::Pause,
            "/resume" => Self::Resume(rest),
            "/approve" => Self::Approve,
            "/reject" => Self::Reject(rest),
            "/stop" => Self::Stop,
            _ => Self::Feedback(line.to_string()),
        }
    }

    /// Forward to the run. Returns whether the run accepted it.
    pub fn apply(self, control: &RunControl) -> bool {
        match self {
            Self::Pause => control.pause(),
            Self::Resume(message) => control.resume(message),
            Self::Approve => control.approve(),
            Self::Reject(feedback) => control.reject(feedback),
            Self::Stop => control.stop(),
            Self::Feedback(text) => control.submit_feedback(text),
            Self::Empty => false,
        }
    }
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Text for one notification, or `None` when it has no terminal form.
pub fn render(event: &RunEvent) -> Option<String> {
    match &event.payload {
        Notification::Clear => None,
        Notification::Running { value: true } => Some("[medic] diagnosing...".to_string()),
        Notification::Running { value: false } => Some("[medic] done".to_string()),
        Notification::Paused { value: true } => Some("[medic] paused".to_string()),
        Notification::Paused { value: false } => Some("[medic] resumed".to_string()),
        Notification::Turn { role, content } => Some(render_turn(*role, content)),
        Notification::ApprovalRequest {
            tool_name,
            args_text,
        } => Some(format!(
            "[approval] {tool_name} wants to run with:\n{args_text}\n\
             Type /approve, or /reject followed by optional feedback."
        )),
        Notification::ToolResult {
            tool_name,
            content,
            is_error,
        } => {
            let status = if *is_error { "failed" } else { "ok" };
            Some(format!("[tool {tool_name}: {status}]\n{}", preview(content)))
        }
    }
}

fn render_turn(role: TurnRole, content: &str) -> String {
    match role {
        TurnRole::Agent => format!("agent> {content}"),
        TurnRole::Supervisor => format!("you> {content}"),
        TurnRole::System => format!("-- {content}"),
        TurnRole::Intervention => format!(">> {content}"),
        TurnRole::Failure => format!("error: {content}"),
    }
}

fn preview(content: &str) -> String {
    let total = content.chars().count();
    if total <= PREVIEW_CHARS {
        return content.to_string();
    }
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{head}\n... ({} more characters)", total - PREVIEW_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(payload: Notification) -> RunEvent {
        RunEvent {
            run_id: Uuid::new_v4(),
            seq: 1,
            timestamp: Utc::now(),
            payload,
        }
    }

    #[test]
    fn parses_control_commands() {
        assert_eq!(ControlLine::parse("/pause"), ControlLine::Pause);
        assert_eq!(ControlLine::parse("  /resume  "), ControlLine::Resume(None));
        assert_eq!(
            ControlLine::parse("/resume check the logs"),
            ControlLine::Resume(Some("check the logs".into()))
        );
        assert_eq!(ControlLine::parse("/approve"), ControlLine::Approve);
        assert_eq!(
            ControlLine::parse("/reject too dangerous"),
            ControlLine::Reject(Some("too dangerous".into()))
        );
        assert_eq!(ControlLine::parse("/stop"), ControlLine::Stop);
        assert_eq!(ControlLine::parse(""), ControlLine::Empty);
    }

    #[test]
    fn other_lines_are_feedback() {
        assert_eq!(
            ControlLine::parse("look at build.rs"),
            ControlLine::Feedback("look at build.rs".into())
        );
        assert_eq!(
            ControlLine::parse("/unknown thing"),
            ControlLine::Feedback("/unknown thing".into())
        );
    }

    #[test]
    fn clear_has_no_terminal_form() {
        assert!(render(&event(Notification::Clear)).is_none());
    }

    #[test]
    fn renders_turns_by_role() {
        let text = render(&event(Notification::turn(TurnRole::Failure, "boom"))).unwrap();
        assert_eq!(text, "error: boom");
        let text = render(&event(Notification::turn(TurnRole::Agent, "hi"))).unwrap();
        assert_eq!(text, "agent> hi");
    }

    #[test]
    fn long_tool_output_is_previewed() {
        let text = render(&event(Notification::ToolResult {
            tool_name: "read_file".into(),
            content: "x".repeat(PREVIEW_CHARS + 10),
            is_error: false,
        }))
        .unwrap();
        assert!(text.starts_with("[tool read_file: ok]"));
        assert!(text.ends_with("(10 more characters)"));
    }
}
