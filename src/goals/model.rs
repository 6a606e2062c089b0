//! Goal data model and its enums.
//!
//! Enum values travel as SCREAMING_SNAKE_CASE strings both on the wire (tool
//! arguments, tool results) and in the database. Lowercase spellings are
//! accepted on input because models often emit them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default owner for goals created without an explicit user.
pub const DEFAULT_USER_ID: &str = "default_user";

/// Whether a goal is achieved once or practiced as a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalType {
    #[default]
    #[serde(alias = "one_time", alias = "one-time")]
    OneTime,
    #[serde(alias = "recurring")]
    Recurring,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "ONE_TIME",
            Self::Recurring => "RECURRING",
        }
    }
}

impl FromStr for GoalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "ONE_TIME" => Ok(Self::OneTime),
            "RECURRING" => Ok(Self::Recurring),
            other => Err(format!("unknown goal type: {other}")),
        }
    }
}

/// A user's top-level objective. Root of boss stages, quests, and quest logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub goal_id: Uuid,
    pub user_id: String,
    pub title: String,
    pub goal_type: GoalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            goal_id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            goal_type: GoalType::default(),
            motivation: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_goal_type(mut self, goal_type: GoalType) -> Self {
        self.goal_type = goal_type;
        self
    }

    pub fn with_motivation(mut self, motivation: impl Into<String>) -> Self {
        self.motivation = Some(motivation.into());
        self
    }
}

/// Direction in which a metric counts toward its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    #[serde(alias = "incremental")]
    Incremental,
    #[serde(alias = "decremental")]
    Decremental,
}

/// A measurable target attached to the in-progress goal.
///
/// Metrics live only in the conversation snapshot; there is no metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub metric_name: String,
    pub metric_type: MetricType,
    pub target_value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,
}

/// Lifecycle of a boss stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BossStatus {
    #[default]
    #[serde(alias = "planned")]
    Planned,
    #[serde(alias = "ready")]
    Ready,
    #[serde(alias = "in_progress")]
    InProgress,
    #[serde(alias = "completed")]
    Completed,
}

impl BossStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Ready => "READY",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    /// Ready and in-progress stages both count as "being fought".
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ready | Self::InProgress)
    }
}

impl FromStr for BossStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PLANNED" => Ok(Self::Planned),
            "READY" => Ok(Self::Ready),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(format!("unknown boss status: {other}")),
        }
    }
}

/// A major milestone of a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossStage {
    pub boss_id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_criteria: Option<String>,
    /// 1-based position within the goal.
    pub stage_order: u32,
    pub status: BossStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_week: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// How demanding a quest is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyTier {
    #[serde(alias = "easy")]
    Easy,
    #[default]
    #[serde(alias = "normal")]
    Normal,
    #[serde(alias = "hard")]
    Hard,
}

impl DifficultyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Normal => "NORMAL",
            Self::Hard => "HARD",
        }
    }
}

impl FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EASY" => Ok(Self::Easy),
            "NORMAL" => Ok(Self::Normal),
            "HARD" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty tier: {other}")),
        }
    }
}

/// A concrete daily or short-term task the user accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub quest_id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub difficulty_tier: DifficultyTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_duration_minutes: Option<u32>,
    #[serde(default)]
    pub variation_tags: Vec<String>,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_prompt_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Category of positive artifact surfaced by a quest outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LootType {
    #[serde(alias = "achievement")]
    Achievement,
    #[serde(alias = "insight")]
    Insight,
    #[serde(alias = "emotion")]
    Emotion,
}

impl LootType {
    pub const ALL: [LootType; 3] = [Self::Achievement, Self::Insight, Self::Emotion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Achievement => "ACHIEVEMENT",
            Self::Insight => "INSIGHT",
            Self::Emotion => "EMOTION",
        }
    }
}

impl FromStr for LootType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACHIEVEMENT" => Ok(Self::Achievement),
            "INSIGHT" => Ok(Self::Insight),
            "EMOTION" => Ok(Self::Emotion),
            other => Err(format!("unknown loot type: {other}")),
        }
    }
}

/// Self-reported energy after a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyStatus {
    #[serde(alias = "ready_for_boss")]
    ReadyForBoss,
    #[serde(alias = "keeping_pace")]
    KeepingPace,
    #[serde(alias = "needs_potion")]
    NeedsPotion,
}

impl EnergyStatus {
    pub const ALL: [EnergyStatus; 3] = [Self::ReadyForBoss, Self::KeepingPace, Self::NeedsPotion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadyForBoss => "READY_FOR_BOSS",
            Self::KeepingPace => "KEEPING_PACE",
            Self::NeedsPotion => "NEEDS_POTION",
        }
    }

    /// The "needs recovery" state that switches the coach into a gentler tone.
    pub fn needs_recovery(&self) -> bool {
        matches!(self, Self::NeedsPotion)
    }
}

impl FromStr for EnergyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READY_FOR_BOSS" => Ok(Self::ReadyForBoss),
            "KEEPING_PACE" => Ok(Self::KeepingPace),
            "NEEDS_POTION" => Ok(Self::NeedsPotion),
            other => Err(format!("unknown energy status: {other}")),
        }
    }
}

/// Immutable record of what happened when the user attempted a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestLog {
    pub log_id: Uuid,
    pub quest_id: Uuid,
    pub goal_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    /// Free-form outcome, e.g. `COMPLETED` or `FAILED`.
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perceived_difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_status: Option<EnergyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loot_type: Option<LootType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_variation_seed: Option<String>,
}

/// How much challenge the user wants from suggested quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeAppetite {
    #[serde(alias = "low")]
    Low,
    #[default]
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
}

impl ChallengeAppetite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl FromStr for ChallengeAppetite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(format!("unknown challenge appetite: {other}")),
        }
    }
}

/// Vocabulary used when talking to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThemePreference {
    #[default]
    #[serde(alias = "game")]
    Game,
    #[serde(alias = "professional")]
    Professional,
}

impl ThemePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Game => "GAME",
            Self::Professional => "PROFESSIONAL",
        }
    }
}

impl FromStr for ThemePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GAME" => Ok(Self::Game),
            "PROFESSIONAL" => Ok(Self::Professional),
            other => Err(format!("unknown theme preference: {other}")),
        }
    }
}

/// Per-user coaching preferences. Missing rows mean defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: String,
    #[serde(default)]
    pub challenge_appetite: ChallengeAppetite,
    #[serde(default)]
    pub theme_preference: ThemePreference,
}

impl UserPreference {
    pub fn defaults_for(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            challenge_appetite: ChallengeAppetite::default(),
            theme_preference: ThemePreference::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_accept_lowercase_input() {
        let t: MetricType = serde_json::from_str("\"incremental\"").unwrap();
        assert_eq!(t, MetricType::Incremental);
        let t: MetricType = serde_json::from_str("\"DECREMENTAL\"").unwrap();
        assert_eq!(t, MetricType::Decremental);
        let s: BossStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(s, BossStatus::InProgress);
    }

    #[test]
    fn enums_serialize_screaming() {
        assert_eq!(
            serde_json::to_string(&EnergyStatus::NeedsPotion).unwrap(),
            "\"NEEDS_POTION\""
        );
        assert_eq!(
            serde_json::to_string(&GoalType::OneTime).unwrap(),
            "\"ONE_TIME\""
        );
    }

    #[test]
    fn as_str_matches_serde() {
        for loot in LootType::ALL {
            let json = serde_json::to_string(&loot).unwrap();
            assert_eq!(format!("\"{}\"", loot.as_str()), json);
            assert_eq!(loot.as_str().parse::<LootType>().unwrap(), loot);
        }
        for energy in EnergyStatus::ALL {
            let json = serde_json::to_string(&energy).unwrap();
            assert_eq!(format!("\"{}\"", energy.as_str()), json);
        }
    }

    #[test]
    fn defaults() {
        let pref = UserPreference::defaults_for("u1");
        assert_eq!(pref.challenge_appetite, ChallengeAppetite::Medium);
        assert_eq!(pref.theme_preference, ThemePreference::Game);
        assert_eq!(DifficultyTier::default(), DifficultyTier::Normal);
        assert_eq!(BossStatus::default(), BossStatus::Planned);
        assert!(BossStatus::Ready.is_active());
        assert!(!BossStatus::Completed.is_active());
    }

    #[test]
    fn goal_builder() {
        let goal = Goal::new("u1", "5km 습관")
            .with_goal_type(GoalType::Recurring)
            .with_motivation("건강");
        assert_eq!(goal.title, "5km 습관");
        assert_eq!(goal.goal_type, GoalType::Recurring);
        assert_eq!(goal.motivation.as_deref(), Some("건강"));
    }
}
