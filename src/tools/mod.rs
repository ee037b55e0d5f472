//! Tool system: contracts, schemas, validation and the capability registry.

pub mod arguments;
pub mod builtin;
pub mod registry;
pub mod tool;
pub mod truncate;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::{RiskClass, ToolRegistry};
pub use tool::{AgentTool, Tool, ToolExecutionContext};
pub use truncate::truncate_output;
pub use types::{AgentToolParameters, ToolDefinition};
pub use validation::validate_arguments;
