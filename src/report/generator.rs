//! Report generator: builds one report and writes it to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::report::{ReportPeriod, ReportSummary, file_name, gather_summary, render_report};
use crate::store::Database;

pub struct ReportGenerator {
    db: Arc<dyn Database>,
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(db: Arc<dyn Database>, config: ReportConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Generate and write a report ending now.
    pub async fn run_once(
        &self,
        period: ReportPeriod,
        user_id: Option<&str>,
    ) -> Result<PathBuf, ReportError> {
        self.run_at(period, user_id, Utc::now()).await
    }

    /// Generate and write a report ending at `now`.
    pub async fn run_at(
        &self,
        period: ReportPeriod,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, ReportError> {
        let summary = self.gather(period, user_id, now).await?;
        let content = render_report(&summary);
        let path = write_report(&content, &summary, &self.config.output_dir).await?;
        tracing::info!(
            period = %period,
            user = %summary.user_label,
            path = %path.display(),
            "Report written"
        );
        Ok(path)
    }

    pub async fn gather(
        &self,
        period: ReportPeriod,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReportSummary, ReportError> {
        gather_summary(
            self.db.as_ref(),
            period,
            user_id,
            now,
            &self.config.usage_log,
        )
        .await
    }
}

/// Write `content` under `output_dir`, creating it if needed.
pub async fn write_report(
    content: &str,
    summary: &ReportSummary,
    output_dir: &Path,
) -> Result<PathBuf, ReportError> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(file_name(summary));
    tokio::fs::write(&path, content).await?;
    Ok(path)
}
