//! Goal planning domain types.

pub mod model;

pub use model::{
    BossStage, BossStatus, ChallengeAppetite, DifficultyTier, EnergyStatus, Goal, GoalType,
    LootType, Metric, MetricType, Quest, QuestLog, ThemePreference, UserPreference,
};
