//! Review Agents
//!
//! The consumer of the provider chain: builds a structured prompt around
//! source code and a role's instructions, runs it through the chain, and
//! parses the answer into typed issues. A failed chain call degrades into
//! an empty review with an explanatory summary so one file's failure never
//! aborts the rest of the batch.

pub mod parser;

use crate::providers::ProviderChain;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

/// A single issue found during review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub file_path: String,
    pub line_start: u32,
    pub line_end: Option<u32>,
    pub severity: Severity,
    /// Reviewing role that produced the issue ("style", "security", ...).
    pub category: String,
    pub title: String,
    pub description: String,
    pub suggestion: Option<String>,
    pub code_snippet: Option<String>,
}

/// Review results for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReview {
    pub file_path: String,
    pub issues: Vec<Issue>,
    pub summary: String,
}

/// A file submitted for review.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Specialization of a review agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewRole {
    Style,
    Security,
    Performance,
    Logic,
}

impl ReviewRole {
    pub const ALL: [ReviewRole; 4] = [
        ReviewRole::Style,
        ReviewRole::Security,
        ReviewRole::Performance,
        ReviewRole::Logic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReviewRole::Style => "style",
            ReviewRole::Security => "security",
            ReviewRole::Performance => "performance",
            ReviewRole::Logic => "logic",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            ReviewRole::Style => {
                "You are an expert code style reviewer. Identify naming, formatting, \
                 readability and idiom issues. Only flag concrete problems."
            }
            ReviewRole::Security => {
                "You are an expert security code reviewer. Identify injection risks, \
                 credential leaks, missing validation and unsafe cryptography. \
                 Avoid false positives."
            }
            ReviewRole::Performance => {
                "You are an expert performance reviewer. Identify needless allocation, \
                 quadratic behavior, blocking calls on hot paths and wasted I/O."
            }
            ReviewRole::Logic => {
                "You are an expert logic reviewer. Identify bugs, unhandled edge cases, \
                 off-by-one mistakes and error paths that lose information."
            }
        }
    }
}

/// A role-specialized review agent backed by the provider chain.
pub struct ReviewAgent {
    role: ReviewRole,
    chain: Arc<ProviderChain>,
    /// Deadline for one file's generation call, when set.
    timeout: Option<Duration>,
}

impl ReviewAgent {
    pub fn new(role: ReviewRole, chain: Arc<ProviderChain>) -> Self {
        Self {
            role,
            chain,
            timeout: None,
        }
    }

    /// Set a per-file deadline. Timed-out reviews degrade exactly like an
    /// exhausted chain.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn role(&self) -> ReviewRole {
        self.role
    }

    /// Review one file. Never fails: a chain error becomes an empty review
    /// whose summary explains what happened.
    pub async fn review_file(&self, path: &str, code: &str, context: &str) -> FileReview {
        let prompt = self.build_prompt(path, code, context);

        let result = match self.timeout {
            Some(timeout) => self.chain.generate_with_timeout(&prompt, timeout).await,
            None => self.chain.generate(&prompt).await,
        };

        match result {
            Ok(generation) => {
                let issues = parser::parse_issues(&generation.text, path, self.role.name());
                let summary = summarize(self.role, &issues);
                FileReview {
                    file_path: path.to_string(),
                    issues,
                    summary,
                }
            }
            Err(e) => {
                warn!(file = path, role = self.role.name(), error = %e, "review degraded to empty result");
                FileReview {
                    file_path: path.to_string(),
                    issues: Vec::new(),
                    summary: format!("Error during {} review: {e}", self.role.name()),
                }
            }
        }
    }

    /// Review a batch of files sequentially. One file's failure never stops
    /// the others.
    pub async fn review_files(&self, files: &[SourceFile], context: &str) -> Vec<FileReview> {
        let mut reviews = Vec::with_capacity(files.len());
        for file in files {
            reviews.push(self.review_file(&file.path, &file.content, context).await);
        }
        reviews
    }

    fn build_prompt(&self, path: &str, code: &str, context: &str) -> String {
        let context = if context.is_empty() {
            "No additional context provided."
        } else {
            context
        };

        format!(
            "{instructions}\n\n\
             ## File Information\n\
             - **File Path**: {path}\n\
             - **Language**: {language}\n\n\
             ## Additional Context\n\
             {context}\n\n\
             ## Code to Review\n\
             ```\n\
             {code}\n\
             ```\n\n\
             ## Response Format\n\
             Respond with a JSON array of issues found. Each issue should have:\n\
             - \"line_start\": integer (1-indexed line number where issue starts)\n\
             - \"line_end\": integer or null\n\
             - \"severity\": one of \"critical\", \"high\", \"medium\", \"low\", \"info\"\n\
             - \"title\": short title (max 100 chars)\n\
             - \"description\": detailed explanation\n\
             - \"suggestion\": how to fix the issue (optional)\n\
             - \"code_snippet\": the problematic code (optional)\n\n\
             If no issues are found, return an empty array: []\n\n\
             Return ONLY the JSON array, no other text.\n",
            instructions = self.role.instructions(),
            language = parser::detect_language(path),
        )
    }
}

/// Human-readable roll-up like "Found 2 security issue(s): 1 high, 1 low".
fn summarize(role: ReviewRole, issues: &[Issue]) -> String {
    if issues.is_empty() {
        return format!("No {} issues found.", role.name());
    }

    let mut counts: Vec<(Severity, usize)> = Vec::new();
    for issue in issues {
        match counts.iter_mut().find(|(s, _)| *s == issue.severity) {
            Some((_, n)) => *n += 1,
            None => counts.push((issue.severity, 1)),
        }
    }

    let breakdown = counts
        .iter()
        .map(|(s, n)| format!("{n} {}", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Found {} {} issue(s): {breakdown}",
        issues.len(),
        role.name()
    )
}
