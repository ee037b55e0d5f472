//! Privileged `shell` tool backed by a run-scoped session.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::watch;

use crate::error::MedicError;
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolExecutionContext};
use crate::tools::types::AgentToolParameters;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("ANSI escape regex must compile")
});

pub(crate) fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Shell state shared by every command of one run.
///
/// Closing the session kills any command still running and forgets the
/// command count. A later command reopens it.
#[derive(Debug)]
pub struct ShellSession {
    program: &'static str,
    flag: &'static str,
    open: AtomicBool,
    commands_run: AtomicU64,
    shutdown: watch::Sender<u64>,
}

impl Default for ShellSession {
    fn default() -> Self {
        let (program, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        Self {
            program,
            flag,
            open: AtomicBool::new(false),
            commands_run: AtomicU64::new(0),
            shutdown: watch::channel(0).0,
        }
    }
}

impl ShellSession {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn commands_run(&self) -> u64 {
        self.commands_run.load(Ordering::SeqCst)
    }

    pub async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<String, MedicError> {
        let mut shutdown = self.shutdown.subscribe();
        self.open.store(true, Ordering::SeqCst);
        let seq = self.commands_run.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(seq, command, dir = %working_dir.display(), "shell command");

        let mut cmd = tokio::process::Command::new(self.program);
        cmd.arg(self.flag)
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::select! {
            output = cmd.output() => output.map_err(|e| MedicError::tool("shell", e.to_string()))?,
            _ = tokio::time::sleep(timeout) => {
                return Err(MedicError::tool(
                    "shell",
                    format!("command timed out after {}ms", timeout.as_millis()),
                ));
            }
            _ = shutdown.changed() => {
                return Err(MedicError::tool("shell", "shell session closed while the command was running"));
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let cleaned = strip_ansi(&combined);
        let cleaned = cleaned.trim();

        let status = match output.status.code() {
            Some(0) => "success".to_string(),
            Some(code) => format!("failed (exit code {code})"),
            None => "terminated by signal".to_string(),
        };
        Ok(format!(
            "[command]: {command}\n[exit status]: {status}\n[output]:\n{}",
            if cleaned.is_empty() { "(no output)" } else { cleaned }
        ))
    }

    /// Kill in-flight commands and reset. Idempotent.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.shutdown.send_modify(|epoch| *epoch += 1);
            let ran = self.commands_run.swap(0, Ordering::SeqCst);
            tracing::debug!(commands_run = ran, "shell session closed");
        }
    }
}

/// Runs arbitrary commands in the project directory. Needs approval.
pub struct ShellTool {
    session: Arc<ShellSession>,
    parameters: AgentToolParameters,
}

impl ShellTool {
    pub fn new(session: Arc<ShellSession>) -> Self {
        Self {
            session,
            parameters: AgentToolParameters::object()
                .string("command", "Shell command to run in the project directory", true)
                .integer("timeout", "Timeout in milliseconds (default from config)", false)
                .build(),
        }
    }

    pub fn session(&self) -> &Arc<ShellSession> {
        &self.session
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Run a shell command in the project directory and return its exit status and combined output."
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<String, MedicError> {
        let command = args.get_str("command")?;
        let timeout = args
            .get_u64_opt("timeout")
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(ctx.default_timeout);
        self.session.run(command, &ctx.working_dir, timeout).await
    }

    async fn teardown(&self) {
        self.session.close();
    }
}

/// Create the `shell` tool with a fresh session.
pub fn shell_tool() -> Arc<dyn Tool> {
    Arc::new(ShellTool::new(Arc::new(ShellSession::default())))
}
