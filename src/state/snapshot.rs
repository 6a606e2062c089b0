//! Conversation snapshot: the goal-in-progress mirror kept per conversation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::goals::{EnergyStatus, GoalType, LootType, Metric, UserPreference};

/// Onboarding stages of a conversation.
///
/// Progresses linearly: Initial → Planning → Questing → Reflecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStage {
    #[default]
    Initial,
    Planning,
    Questing,
    Reflecting,
}

impl OnboardingStage {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStage) -> bool {
        use OnboardingStage::*;
        matches!(
            (self, target),
            (Initial, Planning) | (Planning, Questing) | (Questing, Reflecting)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reflecting)
    }

    pub fn next(&self) -> Option<OnboardingStage> {
        use OnboardingStage::*;
        match self {
            Initial => Some(Planning),
            Planning => Some(Questing),
            Questing => Some(Reflecting),
            Reflecting => None,
        }
    }

    /// Feature unlocked on entering this stage.
    pub fn unlocks(&self) -> Option<Feature> {
        match self {
            Self::Initial => None,
            Self::Planning => Some(Feature::Boss),
            Self::Questing => Some(Feature::Loot),
            Self::Reflecting => Some(Feature::Energy),
        }
    }
}

impl std::fmt::Display for OnboardingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::Planning => "planning",
            Self::Questing => "questing",
            Self::Reflecting => "reflecting",
        };
        write!(f, "{s}")
    }
}

/// A progressively disclosed planning feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Loot,
    Energy,
    Boss,
}

/// Feature flags gating planning operations. Only ever switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub loot: bool,
    #[serde(default)]
    pub energy: bool,
    #[serde(default)]
    pub boss: bool,
}

impl FeatureFlags {
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Loot => self.loot,
            Feature::Energy => self.energy,
            Feature::Boss => self.boss,
        }
    }

    pub fn enable(&mut self, feature: Feature) {
        match feature {
            Feature::Loot => self.loot = true,
            Feature::Energy => self.energy = true,
            Feature::Boss => self.boss = true,
        }
    }
}

/// One step of a weekly plan toward a boss stage.
///
/// Only `title` is interpreted; whatever else the model sends rides along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStep {
    pub title: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A quest variation offered to the user but not yet accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestCandidate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_tier: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Volatile per-conversation state between `create_goal` and `finalize_goal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    pub goal_id: Uuid,
    pub user_id: String,
    pub goal_title: String,
    pub goal_type: GoalType,
    pub metrics: Vec<Metric>,
    pub motivation: Option<String>,
    pub onboarding_stage: OnboardingStage,
    pub feature_flags: FeatureFlags,
    pub preferences: UserPreference,
    /// Boss stage ids in creation order.
    pub boss_stage_ids: Vec<Uuid>,
    pub boss_titles: HashMap<Uuid, String>,
    pub weekly_plan: HashMap<Uuid, Vec<WeeklyStep>>,
    pub current_variations: Vec<QuestCandidate>,
    pub last_weekly_step: Option<String>,
    pub accepted_quest_ids: Vec<Uuid>,
    pub quest_log_ids: Vec<Uuid>,
    pub last_energy: Option<EnergyStatus>,
    pub last_loot: Option<LootType>,
    pub last_mood: Option<String>,
}

impl ConversationSnapshot {
    /// Fresh snapshot: empty lists, initial stage, every flag off.
    pub fn new(
        conversation_id: impl Into<String>,
        goal_id: Uuid,
        goal_title: impl Into<String>,
        preferences: UserPreference,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            goal_id,
            user_id: preferences.user_id.clone(),
            goal_title: goal_title.into(),
            goal_type: GoalType::default(),
            metrics: Vec::new(),
            motivation: None,
            onboarding_stage: OnboardingStage::default(),
            feature_flags: FeatureFlags::default(),
            preferences,
            boss_stage_ids: Vec::new(),
            boss_titles: HashMap::new(),
            weekly_plan: HashMap::new(),
            current_variations: Vec::new(),
            last_weekly_step: None,
            accepted_quest_ids: Vec::new(),
            quest_log_ids: Vec::new(),
            last_energy: None,
            last_loot: None,
            last_mood: None,
        }
    }

    /// Advance the onboarding stage, unlocking whatever the new stage opens.
    pub fn advance(&mut self) -> Result<OnboardingStage, String> {
        let next = self
            .onboarding_stage
            .next()
            .ok_or_else(|| "Already at terminal stage".to_string())?;
        if !self.onboarding_stage.can_transition_to(next) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.onboarding_stage, next
            ));
        }
        self.onboarding_stage = next;
        if let Some(feature) = next.unlocks() {
            self.feature_flags.enable(feature);
        }
        Ok(next)
    }

    /// Title of the earliest boss stage defined in this conversation.
    pub fn current_boss_title(&self) -> Option<&str> {
        self.boss_stage_ids
            .first()
            .and_then(|id| self.boss_titles.get(id))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ConversationSnapshot {
        ConversationSnapshot::new(
            "conv_1",
            Uuid::new_v4(),
            "5km 습관",
            UserPreference::defaults_for("u1"),
        )
    }

    #[test]
    fn valid_transitions() {
        use OnboardingStage::*;
        for (from, to) in [(Initial, Planning), (Planning, Questing), (Questing, Reflecting)] {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
        assert!(!Initial.can_transition_to(Questing));
        assert!(!Questing.can_transition_to(Planning));
        assert!(!Reflecting.can_transition_to(Initial));
    }

    #[test]
    fn display_matches_serde() {
        use OnboardingStage::*;
        for stage in [Initial, Planning, Questing, Reflecting] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }

    #[test]
    fn new_snapshot_starts_locked() {
        let snap = snapshot();
        assert_eq!(snap.onboarding_stage, OnboardingStage::Initial);
        assert_eq!(snap.feature_flags, FeatureFlags::default());
        assert!(snap.metrics.is_empty());
        assert_eq!(snap.user_id, "u1");
    }

    #[test]
    fn advance_unlocks_features_in_order() {
        let mut snap = snapshot();
        assert_eq!(snap.advance().unwrap(), OnboardingStage::Planning);
        assert!(snap.feature_flags.boss);
        assert!(!snap.feature_flags.loot);

        snap.advance().unwrap();
        assert!(snap.feature_flags.loot);
        assert!(!snap.feature_flags.energy);

        snap.advance().unwrap();
        assert!(snap.feature_flags.energy);
        assert!(snap.onboarding_stage.is_terminal());
        assert!(snap.advance().is_err());
        // Flags survive the failed advance.
        assert!(snap.feature_flags.boss && snap.feature_flags.loot);
    }

    #[test]
    fn candidate_keeps_unknown_fields() {
        let json = serde_json::json!({"title": "3km 조깅", "duration": 20});
        let c: QuestCandidate = serde_json::from_value(json).unwrap();
        assert_eq!(c.title, "3km 조깅");
        assert!(c.reason.is_none());
        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["duration"], 20);
        assert!(back.get("reason").is_none());
    }
}
