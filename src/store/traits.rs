//! Unified `Database` trait: single async interface for goal persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::goals::{BossStage, BossStatus, Goal, GoalType, Quest, QuestLog, UserPreference};

/// Backend-agnostic database trait covering goals, boss stages, quests,
/// quest logs, and user preferences.
///
/// Every write is its own commit; there is no cross-call transaction.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Goals ───────────────────────────────────────────────────────

    async fn create_goal(&self, goal: &Goal) -> Result<(), DatabaseError>;

    async fn get_goal(&self, goal_id: Uuid) -> Result<Option<Goal>, DatabaseError>;

    /// Write the final goal type and motivation captured during the conversation.
    async fn update_goal_final(
        &self,
        goal_id: Uuid,
        goal_type: GoalType,
        motivation: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// Delete a goal and, by cascade, everything under it.
    async fn delete_goal(&self, goal_id: Uuid) -> Result<bool, DatabaseError>;

    // ── Boss stages ─────────────────────────────────────────────────

    async fn create_boss_stage(&self, stage: &BossStage) -> Result<(), DatabaseError>;

    /// Boss stages of a goal ordered by `(stage_order, title)`.
    async fn list_boss_stages(&self, goal_id: Uuid) -> Result<Vec<BossStage>, DatabaseError>;

    /// Boss stages of several goals, ordered by goal then `stage_order`.
    async fn list_boss_stages_for_goals(
        &self,
        goal_ids: &[Uuid],
    ) -> Result<Vec<BossStage>, DatabaseError>;

    async fn update_boss_stage_status(
        &self,
        boss_id: Uuid,
        status: BossStatus,
    ) -> Result<(), DatabaseError>;

    // ── Quests ──────────────────────────────────────────────────────

    async fn create_quest(&self, quest: &Quest) -> Result<(), DatabaseError>;

    async fn get_quest(&self, quest_id: Uuid) -> Result<Option<Quest>, DatabaseError>;

    // ── Quest logs (append-only) ────────────────────────────────────

    async fn log_quest_event(&self, log: &QuestLog) -> Result<(), DatabaseError>;

    /// Newest-first logs of one goal.
    async fn list_recent_quest_logs(
        &self,
        goal_id: Uuid,
        limit: usize,
    ) -> Result<Vec<QuestLog>, DatabaseError>;

    /// Logs with `start <= occurred_at <= end`, oldest first, optionally
    /// restricted to goals owned by `user_id`.
    async fn list_quest_logs_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> Result<Vec<QuestLog>, DatabaseError>;

    // ── User preferences ────────────────────────────────────────────

    /// Stored preference, or defaults when the user has no row.
    async fn get_user_preference(&self, user_id: &str) -> Result<UserPreference, DatabaseError>;

    async fn set_user_preference(&self, pref: &UserPreference) -> Result<(), DatabaseError>;
}
