//! Aggregation of quest logs and boss stages over a report window.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ReportError;
use crate::goals::{BossStatus, QuestLog};
use crate::llm::UsageSummary;
use crate::llm::usage::summarize_file;
use crate::report::ReportPeriod;
use crate::store::Database;

/// Tally key for logs without a loot type.
pub const UNSPECIFIED_LOOT: &str = "UNSPECIFIED";
/// Tally key for logs without an energy status.
pub const UNKNOWN_ENERGY: &str = "UNKNOWN";
/// Most recent mood notes kept for the quote block.
pub const MAX_RECENT_QUOTES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub period: ReportPeriod,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    /// User id, or `all-users` when unfiltered.
    pub user_label: String,
    pub loot_counts: HashMap<String, usize>,
    /// Mood notes per loot type, in log order.
    pub loot_samples: HashMap<String, Vec<String>>,
    pub recent_quotes: Vec<String>,
    pub energy_counts: HashMap<String, usize>,
    pub boss_completed: Vec<String>,
    pub boss_in_progress: Vec<String>,
    pub boss_next: Vec<String>,
    pub usage: Option<UsageSummary>,
}

impl ReportSummary {
    pub fn total_loot(&self) -> usize {
        self.loot_counts.values().sum()
    }

    pub fn loot_count(&self, key: &str) -> usize {
        self.loot_counts.get(key).copied().unwrap_or(0)
    }

    pub fn energy_count(&self, key: &str) -> usize {
        self.energy_counts.get(key).copied().unwrap_or(0)
    }

    /// Latest mood note recorded for a loot type.
    pub fn loot_sample(&self, key: &str) -> Option<&str> {
        self.loot_samples
            .get(key)
            .and_then(|s| s.last())
            .map(String::as_str)
    }
}

pub fn user_label(user_id: Option<&str>) -> String {
    user_id
        .filter(|u| !u.is_empty())
        .unwrap_or("all-users")
        .to_string()
}

/// Collect everything the report shows for `period` ending at `now`.
pub async fn gather_summary(
    db: &dyn Database,
    period: ReportPeriod,
    user_id: Option<&str>,
    now: DateTime<Utc>,
    usage_log: &Path,
) -> Result<ReportSummary, ReportError> {
    let (start, end) = period.window(now);
    let logs = db.list_quest_logs_in_window(start, end, user_id).await?;
    tracing::debug!(period = %period, logs = logs.len(), "Gathered quest logs for report");

    let mut summary = ReportSummary {
        period,
        start,
        end,
        generated_at: now,
        user_label: user_label(user_id),
        loot_counts: HashMap::new(),
        loot_samples: HashMap::new(),
        recent_quotes: Vec::new(),
        energy_counts: HashMap::new(),
        boss_completed: Vec::new(),
        boss_in_progress: Vec::new(),
        boss_next: Vec::new(),
        usage: None,
    };
    tally_logs(&mut summary, &logs);

    let goal_ids: Vec<Uuid> = logs
        .iter()
        .map(|l| l.goal_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !goal_ids.is_empty() {
        for stage in db.list_boss_stages_for_goals(&goal_ids).await? {
            match stage.status {
                BossStatus::Completed => summary.boss_completed.push(stage.title),
                BossStatus::Ready | BossStatus::InProgress => {
                    summary.boss_in_progress.push(stage.title)
                }
                BossStatus::Planned => summary.boss_next.push(stage.title),
            }
        }
    }

    summary.usage = summarize_file(usage_log, start, end).await;
    Ok(summary)
}

fn tally_logs(summary: &mut ReportSummary, logs: &[QuestLog]) {
    for log in logs {
        let loot = log
            .loot_type
            .map(|l| l.as_str())
            .unwrap_or(UNSPECIFIED_LOOT)
            .to_string();
        let energy = log
            .energy_status
            .map(|e| e.as_str())
            .unwrap_or(UNKNOWN_ENERGY)
            .to_string();
        *summary.loot_counts.entry(loot.clone()).or_default() += 1;
        *summary.energy_counts.entry(energy).or_default() += 1;

        if let Some(note) = log.mood_note.as_deref().filter(|n| !n.is_empty()) {
            summary
                .loot_samples
                .entry(loot)
                .or_default()
                .push(note.to_string());
            summary.recent_quotes.push(note.to_string());
        }
    }

    let excess = summary.recent_quotes.len().saturating_sub(MAX_RECENT_QUOTES);
    summary.recent_quotes.drain(..excess);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{EnergyStatus, LootType};

    fn log(loot: Option<LootType>, energy: Option<EnergyStatus>, note: Option<&str>) -> QuestLog {
        QuestLog {
            log_id: Uuid::new_v4(),
            quest_id: Uuid::new_v4(),
            goal_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            outcome: "COMPLETED".into(),
            perceived_difficulty: None,
            energy_status: energy,
            loot_type: loot,
            mood_note: note.map(str::to_string),
            llm_variation_seed: None,
        }
    }

    fn empty() -> ReportSummary {
        let now = Utc::now();
        ReportSummary {
            period: ReportPeriod::Monthly,
            start: now,
            end: now,
            generated_at: now,
            user_label: user_label(None),
            loot_counts: HashMap::new(),
            loot_samples: HashMap::new(),
            recent_quotes: Vec::new(),
            energy_counts: HashMap::new(),
            boss_completed: Vec::new(),
            boss_in_progress: Vec::new(),
            boss_next: Vec::new(),
            usage: None,
        }
    }

    #[test]
    fn tallies_with_fallback_keys() {
        let mut summary = empty();
        tally_logs(
            &mut summary,
            &[
                log(Some(LootType::Achievement), Some(EnergyStatus::ReadyForBoss), Some("a")),
                log(Some(LootType::Achievement), None, Some("b")),
                log(None, Some(EnergyStatus::NeedsPotion), None),
            ],
        );
        assert_eq!(summary.loot_count("ACHIEVEMENT"), 2);
        assert_eq!(summary.loot_count(UNSPECIFIED_LOOT), 1);
        assert_eq!(summary.energy_count(UNKNOWN_ENERGY), 1);
        assert_eq!(summary.energy_count("NEEDS_POTION"), 1);
        assert_eq!(summary.loot_sample("ACHIEVEMENT"), Some("b"));
        assert_eq!(summary.total_loot(), 3);
    }

    #[test]
    fn keeps_last_three_quotes_in_order() {
        let mut summary = empty();
        let logs: Vec<_> = ["1", "2", "3", "4", "5"]
            .iter()
            .map(|n| log(Some(LootType::Insight), None, Some(n)))
            .collect();
        tally_logs(&mut summary, &logs);
        assert_eq!(summary.recent_quotes, vec!["3", "4", "5"]);
        assert_eq!(summary.loot_samples["INSIGHT"].len(), 5);
    }

    #[test]
    fn user_labels() {
        assert_eq!(user_label(Some("user-1")), "user-1");
        assert_eq!(user_label(None), "all-users");
        assert_eq!(user_label(Some("")), "all-users");
    }
}
