//! Tool capability registry: lookup, risk classification and dispatch.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolExecutionContext};
use super::truncate::truncate_output;
use super::types::ToolDefinition;
use super::validation::validate_arguments;
use crate::error::{MedicError, Result};
use crate::types::{ToolCall, ToolResult};

/// Whether a tool may run without a human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskClass {
    Ordinary,
    Privileged,
}

/// Immutable name → tool map plus the set of names that need approval.
///
/// Built once per run from a configuration snapshot.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
    privileged: BTreeSet<String>,
    max_output_chars: usize,
}

impl ToolRegistry {
    /// Later tools with a duplicate name shadow earlier ones.
    pub fn new(
        tools: Vec<Arc<dyn Tool>>,
        privileged: impl IntoIterator<Item = String>,
        max_output_chars: usize,
    ) -> Self {
        let by_name = tools
            .iter()
            .enumerate()
            .map(|(idx, tool)| (tool.name().to_string(), idx))
            .collect();
        Self {
            tools,
            by_name,
            privileged: privileged.into_iter().collect(),
            max_output_chars,
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.by_name
            .get(name)
            .map(|idx| Arc::clone(&self.tools[*idx]))
            .ok_or_else(|| MedicError::UnknownTool(name.to_string()))
    }

    /// Unknown names are ordinary; dispatch will fail them anyway.
    pub fn classify(&self, name: &str) -> RiskClass {
        if self.privileged.contains(name) {
            RiskClass::Privileged
        } else {
            RiskClass::Ordinary
        }
    }

    /// Schema list bound to the model for every reasoning step.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.by_name
            .values()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|idx| {
                let tool = &self.tools[idx];
                ToolDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters().schema.clone(),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn max_output_chars(&self) -> usize {
        self.max_output_chars
    }

    /// Run one tool call to a result. Never fails: lookup, validation and
    /// execution errors become failure results for the model to read.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolExecutionContext) -> ToolResult {
        let outcome = self.try_dispatch(call, ctx).await;
        let result = match outcome {
            Ok(content) => ToolResult::success(call, content),
            Err(err) => {
                tracing::debug!(tool = %call.name, error = %err, "tool call failed");
                ToolResult::failure(call, failure_text(&err))
            }
        };
        ToolResult {
            content: truncate_output(&result.content, self.max_output_chars),
            ..result
        }
    }

    async fn try_dispatch(&self, call: &ToolCall, ctx: &ToolExecutionContext) -> Result<String> {
        let tool = self.resolve(&call.name)?;
        validate_arguments(&call.arguments, &tool.parameters().schema)?;
        let args = ToolArguments::new(call.arguments.clone());
        let ctx = ToolExecutionContext {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            ..ctx.clone()
        };
        tool.execute(&args, &ctx).await
    }

    /// Release every tool's side resources. Safe to call more than once.
    pub async fn teardown(&self) {
        for tool in &self.tools {
            tool.teardown().await;
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.definitions().iter().map(|d| d.name.clone()).collect::<Vec<_>>())
            .field("privileged", &self.privileged)
            .field("max_output_chars", &self.max_output_chars)
            .finish()
    }
}

fn failure_text(err: &MedicError) -> String {
    match err {
        MedicError::UnknownTool(name) => {
            format!("Error: tool '{name}' does not exist. Use one of the tools you were given.")
        }
        MedicError::InvalidArgument(message) => {
            format!("Error: argument validation failed: {message}")
        }
        MedicError::ToolExecution { message, .. } => format!("Error: {message}"),
        other => format!("Error: {other}"),
    }
}
