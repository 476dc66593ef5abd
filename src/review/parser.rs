//! Response Parser
//!
//! LLMs are asked to answer with a bare JSON array of issues, but in
//! practice the array arrives wrapped in markdown fences or prose. This
//! parser digs the array out and drops malformed items instead of failing
//! the whole review.

use crate::review::{Issue, Severity};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default = "default_line")]
    line_start: u32,

    #[serde(default)]
    line_end: Option<u32>,

    severity: Severity,

    #[serde(default = "default_title")]
    title: String,

    #[serde(default)]
    description: String,

    #[serde(default)]
    suggestion: Option<String>,

    #[serde(default)]
    code_snippet: Option<String>,
}

fn default_line() -> u32 {
    1
}

fn default_title() -> String {
    "Issue found".to_string()
}

/// Parse LLM response text into issues for `file_path`, tagged with the
/// reviewing agent's `category`. Unparseable text yields an empty list.
pub fn parse_issues(text: &str, file_path: &str, category: &str) -> Vec<Issue> {
    let Some(array_text) = extract_json_array(text) else {
        debug!(file = file_path, "no JSON array found in LLM response");
        return Vec::new();
    };

    let items: Vec<serde_json::Value> = match serde_json::from_str(array_text) {
        Ok(items) => items,
        Err(e) => {
            debug!(file = file_path, error = %e, "failed to parse issue array");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawIssue>(item).ok())
        .map(|raw| Issue {
            file_path: file_path.to_string(),
            line_start: raw.line_start,
            line_end: raw.line_end,
            severity: raw.severity,
            category: category.to_string(),
            title: raw.title,
            description: raw.description,
            suggestion: raw.suggestion,
            code_snippet: raw.code_snippet,
        })
        .collect()
}

/// Locate the JSON array inside possibly fenced or prose-wrapped text.
fn extract_json_array(text: &str) -> Option<&str> {
    let mut text = text.trim();

    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    text = text.trim();

    if text.starts_with('[') {
        return Some(text);
    }

    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Detect the programming language from the file extension, for the prompt
/// envelope.
pub fn detect_language(file_path: &str) -> &'static str {
    let pairs: &[(&str, &str)] = &[
        (".py", "Python"),
        (".js", "JavaScript"),
        (".ts", "TypeScript"),
        (".jsx", "JavaScript (React)"),
        (".tsx", "TypeScript (React)"),
        (".go", "Go"),
        (".rs", "Rust"),
        (".java", "Java"),
        (".rb", "Ruby"),
        (".php", "PHP"),
        (".c", "C"),
        (".cpp", "C++"),
        (".cs", "C#"),
        (".swift", "Swift"),
        (".kt", "Kotlin"),
    ];

    for (ext, lang) in pairs {
        if file_path.ends_with(ext) {
            return lang;
        }
    }
    "Unknown"
}
