//! Per-conversation goal-in-progress state.

pub mod snapshot;
pub mod store;

pub use snapshot::{
    ConversationSnapshot, Feature, FeatureFlags, OnboardingStage, QuestCandidate, WeeklyStep,
};
pub use store::{InMemoryStateStore, StateStore};
