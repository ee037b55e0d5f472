//! Built-in diagnostic tools.
//!
//! Every tool resolves relative paths against the run's project directory
//! and fails soft: errors come back as failed tool results, never as a
//! crashed run.

mod files;
mod shell;
mod web;

use std::sync::Arc;
use std::time::Duration;

use crate::config::ToolSection;
use crate::tools::tool::Tool;

pub use files::{
    edit_file_lines_tool, find_file_tool, list_dir_tool, read_file_tool, search_in_file_tool,
};
pub use shell::{shell_tool, ShellSession, ShellTool};
pub use web::web_search_tool;

/// Every built-in tool, configured from `limits`. Each call builds a fresh
/// shell session, so tool sets must not be shared between runs.
pub fn all_tools(limits: &ToolSection) -> Vec<Arc<dyn Tool>> {
    vec![
        list_dir_tool(limits.max_list_items),
        find_file_tool(limits.max_find_results),
        read_file_tool(limits.read_line_limit),
        edit_file_lines_tool(),
        search_in_file_tool(limits.max_search_matches),
        web_search_tool(
            limits.web_search_url.clone(),
            Duration::from_millis(limits.web_timeout_ms),
        ),
        shell_tool(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_tools_have_unique_names_and_object_schemas() {
        let tools = all_tools(&ToolSection::default());
        let mut names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "edit_file_lines",
                "find_file",
                "list_dir",
                "read_file",
                "search_in_file",
                "shell",
                "web_search"
            ]
        );
        for tool in &tools {
            assert!(!tool.description().is_empty(), "{}", tool.name());
            assert_eq!(tool.parameters().schema["type"], "object", "{}", tool.name());
        }
    }
}
