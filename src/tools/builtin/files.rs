//! Filesystem tools: listing, finding, reading, editing and searching files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::MedicError;
use crate::tools::tool::{AgentTool, Tool, ToolExecutionContext};
use crate::tools::types::AgentToolParameters;

const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

fn io_error(tool: &str, path: &Path, err: std::io::Error) -> MedicError {
    MedicError::tool(tool, format!("{}: {err}", path.display()))
}

/// Case-insensitive regex; an invalid pattern is matched literally instead.
fn case_insensitive(pattern: &str) -> Result<Regex, MedicError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
        })
        .map_err(|e| MedicError::InvalidArgument(format!("bad pattern: {e}")))
}

/// Create the `list_dir` tool.
pub fn list_dir_tool(max_items: usize) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "list_dir",
        "List a directory's entries, marking directories and files. \
         Optionally filter names with a case-insensitive regex (e.g. '\\.rs$').",
        AgentToolParameters::object()
            .string("dir_path", "Directory path, relative to the project root or absolute", true)
            .string("pattern", "Optional regex filter applied to entry names", false)
            .build(),
        move |args, ctx: ToolExecutionContext| async move {
            let raw = args.get_str("dir_path")?;
            let dir = ctx.resolve_path(raw);
            let filter = args.get_str_opt("pattern").map(case_insensitive).transpose()?;

            let mut read_dir = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| io_error("list_dir", &dir, e))?;
            let mut items = Vec::new();
            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| io_error("list_dir", &dir, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                if filter.as_ref().is_some_and(|re| !re.is_match(&name)) {
                    continue;
                }
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                items.push(format!("{} {name}", if is_dir { "[dir] " } else { "[file]" }));
            }
            items.sort();

            let total = items.len();
            let mut out = format!("Directory '{raw}' ({total} entries):\n");
            out.push_str(&items.iter().take(max_items).cloned().collect::<Vec<_>>().join("\n"));
            if total > max_items {
                out.push_str(&format!("\n... ({} more entries not listed)", total - max_items));
            }
            Ok(out)
        },
    ))
}

/// Expand `{a,b}` alternatives, since `glob::Pattern` has no brace syntax.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close) = pattern[open..].find('}').map(|i| open + i) else {
        return vec![pattern.to_string()];
    };
    let (head, tail) = (&pattern[..open], &pattern[close + 1..]);
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{head}{alt}{tail}")))
        .collect()
}

/// Compile a `find_file` pattern. Patterns without a `/` match at any depth.
pub(crate) fn glob_patterns(pattern: &str) -> Result<Vec<glob::Pattern>, MedicError> {
    expand_braces(pattern)
        .into_iter()
        .map(|alt| {
            let alt = if alt.contains('/') {
                alt.trim_start_matches("./").to_string()
            } else {
                format!("**/{alt}")
            };
            glob::Pattern::new(&alt)
                .map_err(|e| MedicError::InvalidArgument(format!("bad pattern '{alt}': {e}")))
        })
        .collect()
}

fn find_matches(root: &Path, patterns: &[glob::Pattern], limit: usize) -> Vec<(String, bool)> {
    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map_or(true, |name| !SKIPPED_DIRS.contains(&name))
        })
        .build();

    walker
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.depth() > 0)
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            patterns
                .iter()
                .any(|p| p.matches_with(&rel, options))
                .then_some((rel, is_dir))
        })
        .take(limit)
        .collect()
}

/// Create the `find_file` tool.
pub fn find_file_tool(max_results: usize) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "find_file",
        "Recursively find files in the project by glob pattern, e.g. 'config.json' or 'src/**/*.rs'.",
        AgentToolParameters::object()
            .string(
                "pattern",
                "Glob pattern with *, ?, [ab] and {a,b}; patterns without '/' match at any depth",
                true,
            )
            .build(),
        move |args, ctx: ToolExecutionContext| async move {
            let pattern = args.get_str("pattern")?.to_string();
            let patterns = glob_patterns(&pattern)?;
            let root = ctx.working_dir.clone();
            let found = tokio::task::spawn_blocking(move || find_matches(&root, &patterns, max_results))
                .await
                .map_err(|e| MedicError::tool("find_file", e.to_string()))?;

            if found.is_empty() {
                return Ok(format!("No files matching '{pattern}'."));
            }
            let lines: Vec<String> = found
                .into_iter()
                .map(|(rel, is_dir)| format!("{} {rel}", if is_dir { "[dir] " } else { "[file]" }))
                .collect();
            Ok(format!(
                "Matches (showing up to {max_results}):\n{}",
                lines.join("\n")
            ))
        },
    ))
}

/// Create the `read_file` tool -- paged, line-numbered reads.
pub fn read_file_tool(default_line_limit: usize) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "read_file",
        "Read a text file with line numbers. Use start_line and line_limit to page through large files.",
        AgentToolParameters::object()
            .string("file_path", "File path, relative to the project root or absolute", true)
            .integer("start_line", "First line to show (1-based, default 1)", false)
            .integer("line_limit", "Maximum number of lines to show", false)
            .build(),
        move |args, ctx: ToolExecutionContext| async move {
            let raw = args.get_str("file_path")?;
            let path = ctx.resolve_path(raw);
            let start_line = args.get_usize_or("start_line", 1, 1);
            let line_limit = args.get_usize_or("line_limit", default_line_limit, 1);

            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| io_error("read_file", &path, e))?;
            let lines: Vec<&str> = content.lines().collect();
            let total = lines.len();
            if start_line > total.max(1) {
                return Err(MedicError::tool(
                    "read_file",
                    format!("start_line {start_line} is past the end of '{raw}' ({total} lines)"),
                ));
            }

            let start_idx = start_line - 1;
            let end_idx = start_idx.saturating_add(line_limit).min(total);
            let mut out = format!("--- {raw} (lines {start_line}-{end_idx} of {total}) ---\n");
            for (offset, line) in lines[start_idx..end_idx].iter().enumerate() {
                out.push_str(&format!("{:>4} | {line}\n", start_idx + offset + 1));
            }
            if end_idx < total {
                out.push_str(&format!("... {} more lines not shown.", total - end_idx));
            } else {
                out.push_str("--- end of file ---");
            }
            Ok(out)
        },
    ))
}

fn splice_lines(existing: &str, start_line: usize, end_line: usize, new_content: &str) -> String {
    let lines: Vec<&str> = existing.split_inclusive('\n').collect();
    let start_idx = start_line.saturating_sub(1).min(lines.len());
    let end_idx = end_line.min(lines.len()).max(start_idx);

    let mut out = String::with_capacity(existing.len() + new_content.len() + 1);
    for line in &lines[..start_idx] {
        out.push_str(line);
    }
    if start_idx > 0 && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(new_content);
    if !new_content.ends_with('\n') {
        out.push('\n');
    }
    for line in &lines[end_idx..] {
        out.push_str(line);
    }
    out
}

/// Create the `edit_file_lines` tool -- replace an inclusive line range.
pub fn edit_file_lines_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "edit_file_lines",
        "Replace lines start_line..=end_line (1-based) of a file with new content. \
         Creates the file when it does not exist.",
        AgentToolParameters::object()
            .string("file_path", "File path, relative to the project root or absolute", true)
            .integer("start_line", "First line to replace (1-based)", true)
            .integer("end_line", "Last line to replace (inclusive)", true)
            .string("new_content", "Replacement text", true)
            .build(),
        |args, ctx: ToolExecutionContext| async move {
            let raw = args.get_str("file_path")?;
            let path: PathBuf = ctx.resolve_path(raw);
            let start_line = args.get_usize_or("start_line", 1, 1);
            let end_line = args.get_usize_or("end_line", start_line, 0);
            let new_content = args.get_str("new_content")?;

            let updated = match tokio::fs::read_to_string(&path).await {
                Ok(existing) => splice_lines(&existing, start_line, end_line, new_content),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent)
                            .await
                            .map_err(|e| io_error("edit_file_lines", parent, e))?;
                    }
                    new_content.to_string()
                }
                Err(err) => return Err(io_error("edit_file_lines", &path, err)),
            };

            tokio::fs::write(&path, updated)
                .await
                .map_err(|e| io_error("edit_file_lines", &path, e))?;
            Ok(format!("Edited {raw} (lines {start_line}-{end_line})"))
        },
    ))
}

/// Create the `search_in_file` tool.
pub fn search_in_file_tool(max_matches: usize) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "search_in_file",
        "Search a file for a keyword or regex (case-insensitive) and show matching lines with context.",
        AgentToolParameters::object()
            .string("file_path", "File path, relative to the project root or absolute", true)
            .string("keyword", "Keyword or regular expression", true)
            .integer("context_lines", "Lines of context around each match (default 2)", false)
            .build(),
        move |args, ctx: ToolExecutionContext| async move {
            let raw = args.get_str("file_path")?;
            let keyword = args.get_str("keyword")?;
            let context = args.get_usize_or("context_lines", 2, 0);
            let path = ctx.resolve_path(raw);

            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| io_error("search_in_file", &path, e))?;
            let matcher = case_insensitive(keyword)?;
            let lines: Vec<&str> = content.lines().collect();
            let context = context.min(lines.len());

            let chunks: Vec<String> = lines
                .iter()
                .enumerate()
                .filter(|(_, line)| matcher.is_match(line))
                .take(max_matches)
                .map(|(hit, _)| {
                    let start = hit.saturating_sub(context);
                    let end = hit.saturating_add(context).saturating_add(1).min(lines.len());
                    (start..end)
                        .map(|idx| {
                            let marker = if idx == hit { ">>> " } else { "    " };
                            format!("{:>4} | {marker}{}", idx + 1, lines[idx])
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .collect();

            if chunks.is_empty() {
                return Ok(format!("No matches for '{keyword}' in '{raw}'."));
            }
            Ok(format!(
                "--- '{keyword}' in '{raw}' (first {max_matches} matches) ---\n{}",
                chunks.join("\n\n---\n\n")
            ))
        },
    ))
}
