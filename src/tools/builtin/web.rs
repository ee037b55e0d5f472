//! `web_search` tool over the DuckDuckGo instant-answer API.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::MedicError;
use crate::provider::http::{shared_client, status_to_error};
use crate::tools::tool::{AgentTool, Tool, ToolExecutionContext};
use crate::tools::types::AgentToolParameters;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    answer: serde_json::Value,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RelatedTopic {
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
}

fn render(query: &str, body: &InstantAnswer, max_results: usize) -> String {
    let mut sections = Vec::new();
    if let Some(answer) = body.answer.as_str().filter(|a| !a.is_empty()) {
        sections.push(format!("[answer]: {answer}"));
    }
    if !body.abstract_text.is_empty() {
        let source = if body.abstract_url.is_empty() {
            "N/A"
        } else {
            body.abstract_url.as_str()
        };
        sections.push(format!("[abstract]: {}\nsource: {source}", body.abstract_text));
    }
    let topics = body
        .related_topics
        .iter()
        .filter_map(|t| Some((t.text.as_deref()?, t.first_url.as_deref()?)))
        .take(max_results);
    for (idx, (text, url)) in topics.enumerate() {
        sections.push(format!("[result {}]: {text}\nlink: {url}", idx + 1));
    }

    if sections.is_empty() {
        format!("No useful web results for \"{query}\".")
    } else {
        format!("--- web search: \"{query}\" ---\n\n{}", sections.join("\n\n"))
    }
}

/// Create the `web_search` tool against `endpoint`.
pub fn web_search_tool(endpoint: impl Into<String>, timeout: Duration) -> Arc<dyn Tool> {
    let endpoint: Arc<str> = Arc::from(endpoint.into());
    Arc::new(AgentTool::new(
        "web_search",
        "Search the web for documentation or known fixes for an error. \
         Supports operators such as site: and quoted phrases.",
        AgentToolParameters::object()
            .string("query", "Search query", true)
            .integer("max_results", "Maximum related results to return (default 3)", false)
            .build(),
        move |args, _ctx: ToolExecutionContext| {
            let endpoint = Arc::clone(&endpoint);
            async move {
                let query = args.get_str("query")?.trim().to_string();
                let max_results = args.get_usize_or("max_results", 3, 1);

                let response = shared_client()
                    .get(endpoint.as_ref())
                    .query(&[
                        ("q", query.as_str()),
                        ("format", "json"),
                        ("no_html", "1"),
                        ("skip_disambig", "1"),
                    ])
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| MedicError::tool("web_search", e.to_string()))?;

                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|e| MedicError::tool("web_search", e.to_string()))?;
                if !status.is_success() {
                    let err = status_to_error(status.as_u16(), &text);
                    return Err(MedicError::tool("web_search", err.to_string()));
                }
                let body: InstantAnswer = serde_json::from_str(&text)
                    .map_err(|e| MedicError::tool("web_search", format!("unreadable response: {e}")))?;
                Ok(render(&query, &body, max_results))
            }
        },
    ))
}
