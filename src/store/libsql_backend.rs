//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Timestamps are written as
//! fixed-width RFC 3339 strings (microseconds, `Z` suffix) so that range
//! queries can compare them lexically.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::goals::{
    BossStage, BossStatus, ChallengeAppetite, DifficultyTier, EnergyStatus, Goal, GoalType,
    LootType, Quest, QuestLog, ThemePreference, UserPreference,
};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Pool(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_uuid(s: &str, column: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s)
        .map_err(|e| DatabaseError::Serialization(format!("bad uuid in {column}: {e}")))
}

/// Decode a stored SCREAMING_SNAKE_CASE enum through its serde impl.
fn parse_enum<T: DeserializeOwned>(s: &str, column: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Serialization(format!("bad value '{s}' in {column}: {e}")))
}

fn parse_optional_enum<T: DeserializeOwned>(
    s: Option<String>,
    column: &str,
) -> Result<Option<T>, DatabaseError> {
    s.map(|s| parse_enum(&s, column)).transpose()
}

/// Map a libSQL error, separating constraint violations from other failures.
fn write_error(op: &str, e: libsql::Error) -> DatabaseError {
    let msg = e.to_string();
    if msg.contains("constraint failed") {
        DatabaseError::Constraint(format!("{op}: {msg}"))
    } else {
        DatabaseError::Query(format!("{op}: {msg}"))
    }
}

const GOAL_COLUMNS: &str = "goal_id, user_id, title, goal_type, motivation, created_at";

fn row_to_goal(row: &libsql::Row) -> Result<Goal, DatabaseError> {
    let get = |e: libsql::Error| DatabaseError::Query(format!("goal row parse: {e}"));
    let id: String = row.get(0).map_err(get)?;
    let goal_type: String = row.get(3).map_err(get)?;
    let created: String = row.get(5).map_err(get)?;
    Ok(Goal {
        goal_id: parse_uuid(&id, "goals.goal_id")?,
        user_id: row.get(1).map_err(get)?,
        title: row.get(2).map_err(get)?,
        goal_type: parse_enum(&goal_type, "goals.goal_type")?,
        motivation: row.get::<String>(4).ok(),
        created_at: parse_datetime(&created),
    })
}

const BOSS_COLUMNS: &str = "boss_id, goal_id, title, description, success_criteria, stage_order, status, target_week, created_at";

fn row_to_boss_stage(row: &libsql::Row) -> Result<BossStage, DatabaseError> {
    let get = |e: libsql::Error| DatabaseError::Query(format!("boss stage row parse: {e}"));
    let id: String = row.get(0).map_err(get)?;
    let goal_id: String = row.get(1).map_err(get)?;
    let stage_order: i64 = row.get(5).map_err(get)?;
    let status: String = row.get(6).map_err(get)?;
    let created: String = row.get(8).map_err(get)?;
    Ok(BossStage {
        boss_id: parse_uuid(&id, "boss_stages.boss_id")?,
        goal_id: parse_uuid(&goal_id, "boss_stages.goal_id")?,
        title: row.get(2).map_err(get)?,
        description: row.get::<String>(3).ok(),
        success_criteria: row.get::<String>(4).ok(),
        stage_order: stage_order as u32,
        status: parse_enum(&status, "boss_stages.status")?,
        target_week: row.get::<i64>(7).ok().map(|w| w as u32),
        created_at: parse_datetime(&created),
    })
}

const QUEST_COLUMNS: &str = "quest_id, goal_id, title, description, difficulty_tier, expected_duration_minutes, variation_tags, is_custom, origin_prompt_hash, created_at";

fn row_to_quest(row: &libsql::Row) -> Result<Quest, DatabaseError> {
    let get = |e: libsql::Error| DatabaseError::Query(format!("quest row parse: {e}"));
    let id: String = row.get(0).map_err(get)?;
    let goal_id: String = row.get(1).map_err(get)?;
    let tier: String = row.get(4).map_err(get)?;
    let tags: String = row.get(6).map_err(get)?;
    let is_custom: i64 = row.get(7).map_err(get)?;
    let created: String = row.get(9).map_err(get)?;
    Ok(Quest {
        quest_id: parse_uuid(&id, "quests.quest_id")?,
        goal_id: parse_uuid(&goal_id, "quests.goal_id")?,
        title: row.get(2).map_err(get)?,
        description: row.get::<String>(3).ok(),
        difficulty_tier: parse_enum::<DifficultyTier>(&tier, "quests.difficulty_tier")?,
        expected_duration_minutes: row.get::<i64>(5).ok().map(|m| m as u32),
        variation_tags: serde_json::from_str(&tags).map_err(|e| {
            DatabaseError::Serialization(format!("bad quests.variation_tags: {e}"))
        })?,
        is_custom: is_custom != 0,
        origin_prompt_hash: row.get::<String>(8).ok(),
        created_at: parse_datetime(&created),
    })
}

const LOG_COLUMNS: &str = "l.log_id, l.quest_id, l.goal_id, l.occurred_at, l.outcome, l.perceived_difficulty, l.energy_status, l.loot_type, l.mood_note, l.llm_variation_seed";

fn row_to_quest_log(row: &libsql::Row) -> Result<QuestLog, DatabaseError> {
    let get = |e: libsql::Error| DatabaseError::Query(format!("quest log row parse: {e}"));
    let id: String = row.get(0).map_err(get)?;
    let quest_id: String = row.get(1).map_err(get)?;
    let goal_id: String = row.get(2).map_err(get)?;
    let occurred: String = row.get(3).map_err(get)?;
    Ok(QuestLog {
        log_id: parse_uuid(&id, "quest_logs.log_id")?,
        quest_id: parse_uuid(&quest_id, "quest_logs.quest_id")?,
        goal_id: parse_uuid(&goal_id, "quest_logs.goal_id")?,
        occurred_at: parse_datetime(&occurred),
        outcome: row.get(4).map_err(get)?,
        perceived_difficulty: row.get::<String>(5).ok(),
        energy_status: parse_optional_enum::<EnergyStatus>(
            row.get::<String>(6).ok(),
            "quest_logs.energy_status",
        )?,
        loot_type: parse_optional_enum::<LootType>(
            row.get::<String>(7).ok(),
            "quest_logs.loot_type",
        )?,
        mood_note: row.get::<String>(8).ok(),
        llm_variation_seed: row.get::<String>(9).ok(),
    })
}

impl LibSqlBackend {
    async fn collect<T>(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams + Send,
        parse: fn(&libsql::Row) -> Result<T, DatabaseError>,
    ) -> Result<Vec<T>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?
        {
            out.push(parse(&row)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Goals ───────────────────────────────────────────────────────

    async fn create_goal(&self, goal: &Goal) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO goals (goal_id, user_id, title, goal_type, motivation, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    goal.goal_id.to_string(),
                    goal.user_id.as_str(),
                    goal.title.as_str(),
                    goal.goal_type.as_str(),
                    goal.motivation.clone(),
                    format_datetime(&goal.created_at),
                ],
            )
            .await
            .map_err(|e| write_error("create_goal", e))?;

        debug!(goal_id = %goal.goal_id, user_id = %goal.user_id, "Goal created");
        Ok(())
    }

    async fn get_goal(&self, goal_id: Uuid) -> Result<Option<Goal>, DatabaseError> {
        let mut goals = self
            .collect(
                "get_goal",
                &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE goal_id = ?1"),
                params![goal_id.to_string()],
                row_to_goal,
            )
            .await?;
        Ok(goals.pop())
    }

    async fn update_goal_final(
        &self,
        goal_id: Uuid,
        goal_type: GoalType,
        motivation: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE goals SET goal_type = ?1, motivation = ?2 WHERE goal_id = ?3",
                params![
                    goal_type.as_str(),
                    motivation.map(str::to_string),
                    goal_id.to_string()
                ],
            )
            .await
            .map_err(|e| write_error("update_goal_final", e))?;

        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "goal".into(),
                id: goal_id.to_string(),
            });
        }
        debug!(goal_id = %goal_id, "Goal finalized in DB");
        Ok(())
    }

    async fn delete_goal(&self, goal_id: Uuid) -> Result<bool, DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "DELETE FROM goals WHERE goal_id = ?1",
                params![goal_id.to_string()],
            )
            .await
            .map_err(|e| write_error("delete_goal", e))?;
        Ok(changed > 0)
    }

    // ── Boss stages ─────────────────────────────────────────────────

    async fn create_boss_stage(&self, stage: &BossStage) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO boss_stages (boss_id, goal_id, title, description, success_criteria,
                    stage_order, status, target_week, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    stage.boss_id.to_string(),
                    stage.goal_id.to_string(),
                    stage.title.as_str(),
                    stage.description.clone(),
                    stage.success_criteria.clone(),
                    stage.stage_order as i64,
                    stage.status.as_str(),
                    stage.target_week.map(|w| w as i64),
                    format_datetime(&stage.created_at),
                ],
            )
            .await
            .map_err(|e| write_error("create_boss_stage", e))?;

        debug!(
            boss_id = %stage.boss_id,
            goal_id = %stage.goal_id,
            stage_order = stage.stage_order,
            "Boss stage created"
        );
        Ok(())
    }

    async fn list_boss_stages(&self, goal_id: Uuid) -> Result<Vec<BossStage>, DatabaseError> {
        self.collect(
            "list_boss_stages",
            &format!(
                "SELECT {BOSS_COLUMNS} FROM boss_stages WHERE goal_id = ?1
                 ORDER BY stage_order, title"
            ),
            params![goal_id.to_string()],
            row_to_boss_stage,
        )
        .await
    }

    async fn list_boss_stages_for_goals(
        &self,
        goal_ids: &[Uuid],
    ) -> Result<Vec<BossStage>, DatabaseError> {
        let mut stages = Vec::new();
        for goal_id in goal_ids {
            stages.extend(self.list_boss_stages(*goal_id).await?);
        }
        Ok(stages)
    }

    async fn update_boss_stage_status(
        &self,
        boss_id: Uuid,
        status: BossStatus,
    ) -> Result<(), DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE boss_stages SET status = ?1 WHERE boss_id = ?2",
                params![status.as_str(), boss_id.to_string()],
            )
            .await
            .map_err(|e| write_error("update_boss_stage_status", e))?;

        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "boss_stage".into(),
                id: boss_id.to_string(),
            });
        }
        debug!(boss_id = %boss_id, status = %status.as_str(), "Boss stage status updated");
        Ok(())
    }

    // ── Quests ──────────────────────────────────────────────────────

    async fn create_quest(&self, quest: &Quest) -> Result<(), DatabaseError> {
        let tags = serde_json::to_string(&quest.variation_tags)
            .map_err(|e| DatabaseError::Serialization(format!("variation_tags: {e}")))?;

        self.conn()
            .execute(
                "INSERT INTO quests (quest_id, goal_id, title, description, difficulty_tier,
                    expected_duration_minutes, variation_tags, is_custom, origin_prompt_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    quest.quest_id.to_string(),
                    quest.goal_id.to_string(),
                    quest.title.as_str(),
                    quest.description.clone(),
                    quest.difficulty_tier.as_str(),
                    quest.expected_duration_minutes.map(|m| m as i64),
                    tags,
                    quest.is_custom as i64,
                    quest.origin_prompt_hash.clone(),
                    format_datetime(&quest.created_at),
                ],
            )
            .await
            .map_err(|e| write_error("create_quest", e))?;

        debug!(quest_id = %quest.quest_id, goal_id = %quest.goal_id, "Quest created");
        Ok(())
    }

    async fn get_quest(&self, quest_id: Uuid) -> Result<Option<Quest>, DatabaseError> {
        let mut quests = self
            .collect(
                "get_quest",
                &format!("SELECT {QUEST_COLUMNS} FROM quests WHERE quest_id = ?1"),
                params![quest_id.to_string()],
                row_to_quest,
            )
            .await?;
        Ok(quests.pop())
    }

    // ── Quest logs ──────────────────────────────────────────────────

    async fn log_quest_event(&self, log: &QuestLog) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO quest_logs (log_id, quest_id, goal_id, occurred_at, outcome,
                    perceived_difficulty, energy_status, loot_type, mood_note, llm_variation_seed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    log.log_id.to_string(),
                    log.quest_id.to_string(),
                    log.goal_id.to_string(),
                    format_datetime(&log.occurred_at),
                    log.outcome.as_str(),
                    log.perceived_difficulty.clone(),
                    log.energy_status.map(|e| e.as_str()),
                    log.loot_type.map(|l| l.as_str()),
                    log.mood_note.clone(),
                    log.llm_variation_seed.clone(),
                ],
            )
            .await
            .map_err(|e| write_error("log_quest_event", e))?;

        debug!(log_id = %log.log_id, quest_id = %log.quest_id, outcome = %log.outcome, "Quest log recorded");
        Ok(())
    }

    async fn list_recent_quest_logs(
        &self,
        goal_id: Uuid,
        limit: usize,
    ) -> Result<Vec<QuestLog>, DatabaseError> {
        self.collect(
            "list_recent_quest_logs",
            &format!(
                "SELECT {LOG_COLUMNS} FROM quest_logs l WHERE l.goal_id = ?1
                 ORDER BY l.occurred_at DESC LIMIT ?2"
            ),
            params![goal_id.to_string(), limit as i64],
            row_to_quest_log,
        )
        .await
    }

    async fn list_quest_logs_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> Result<Vec<QuestLog>, DatabaseError> {
        let start = format_datetime(&start);
        let end = format_datetime(&end);
        match user_id {
            Some(user_id) => {
                self.collect(
                    "list_quest_logs_in_window",
                    &format!(
                        "SELECT {LOG_COLUMNS} FROM quest_logs l
                         JOIN goals g ON g.goal_id = l.goal_id
                         WHERE l.occurred_at >= ?1 AND l.occurred_at <= ?2 AND g.user_id = ?3
                         ORDER BY l.occurred_at, l.rowid"
                    ),
                    params![start, end, user_id],
                    row_to_quest_log,
                )
                .await
            }
            None => {
                self.collect(
                    "list_quest_logs_in_window",
                    &format!(
                        "SELECT {LOG_COLUMNS} FROM quest_logs l
                         JOIN goals g ON g.goal_id = l.goal_id
                         WHERE l.occurred_at >= ?1 AND l.occurred_at <= ?2
                         ORDER BY l.occurred_at, l.rowid"
                    ),
                    params![start, end],
                    row_to_quest_log,
                )
                .await
            }
        }
    }

    // ── User preferences ────────────────────────────────────────────

    async fn get_user_preference(&self, user_id: &str) -> Result<UserPreference, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT challenge_appetite, theme_preference FROM user_preferences WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user_preference: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let appetite: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_user_preference row: {e}")))?;
                let theme: String = row
                    .get(1)
                    .map_err(|e| DatabaseError::Query(format!("get_user_preference row: {e}")))?;
                Ok(UserPreference {
                    user_id: user_id.to_string(),
                    challenge_appetite: parse_enum::<ChallengeAppetite>(
                        &appetite,
                        "user_preferences.challenge_appetite",
                    )?,
                    theme_preference: parse_enum::<ThemePreference>(
                        &theme,
                        "user_preferences.theme_preference",
                    )?,
                })
            }
            Ok(None) => Ok(UserPreference::defaults_for(user_id)),
            Err(e) => Err(DatabaseError::Query(format!("get_user_preference: {e}"))),
        }
    }

    async fn set_user_preference(&self, pref: &UserPreference) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO user_preferences (user_id, challenge_appetite, theme_preference, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    challenge_appetite = excluded.challenge_appetite,
                    theme_preference = excluded.theme_preference,
                    updated_at = excluded.updated_at",
                params![
                    pref.user_id.as_str(),
                    pref.challenge_appetite.as_str(),
                    pref.theme_preference.as_str(),
                    format_datetime(&Utc::now()),
                ],
            )
            .await
            .map_err(|e| write_error("set_user_preference", e))?;
        Ok(())
    }
}
