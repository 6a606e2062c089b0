//! LLM usage log: one JSON line per model call, summed by the report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// One model call as written to the usage log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl UsageRecord {
    pub fn new(model: &str, prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            model: model.to_string(),
            prompt_tokens: prompt_tokens as u64,
            completion_tokens: completion_tokens as u64,
            total_tokens: prompt_tokens as u64 + completion_tokens as u64,
        }
    }
}

/// Appends usage records to a newline-delimited JSON file.
#[derive(Debug, Clone)]
pub struct UsageLog {
    path: PathBuf,
}

impl UsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Failures are logged and swallowed; usage
    /// accounting never affects the conversation.
    pub async fn append(&self, record: &UsageRecord) {
        if let Err(e) = self.try_append(record).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write usage log");
        }
    }

    async fn try_append(&self, record: &UsageRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

/// Totals over the records at or after some start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageSummary {
    pub total_requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Parse an ISO-8601 timestamp; a value without offset is taken as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|ndt| ndt.and_utc())
}

#[derive(Deserialize)]
struct LooseRecord {
    timestamp: Option<String>,
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

/// Sum usage in `contents` logged within `start..=end`.
///
/// Blank lines, malformed JSON, and unparseable timestamps are skipped.
/// Returns `None` when nothing qualifies.
pub fn summarize_lines(
    contents: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<UsageSummary> {
    let mut summary = UsageSummary::default();
    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(record) = serde_json::from_str::<LooseRecord>(line) else {
            continue;
        };
        let Some(logged_at) = record.timestamp.as_deref().and_then(parse_timestamp) else {
            continue;
        };
        if logged_at < start || logged_at > end {
            continue;
        }
        let prompt = record.prompt_tokens.unwrap_or(0);
        let completion = record.completion_tokens.unwrap_or(0);
        summary.total_requests += 1;
        summary.prompt_tokens += prompt;
        summary.completion_tokens += completion;
        summary.total_tokens += prompt + completion;
    }
    (summary.total_requests > 0).then_some(summary)
}

/// Read and summarize a usage log. A missing file yields `None`.
pub async fn summarize_file(
    path: &Path,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<UsageSummary> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => summarize_lines(&contents, start, end),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read usage log");
            }
            None
        }
    }
}
