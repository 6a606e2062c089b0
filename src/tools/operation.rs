//! The closed set of goal-agent operations and their typed arguments.
//!
//! Every tool the model may call maps to exactly one `Operation` variant.
//! Decoding happens once, here; the agent dispatches with a total match.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ToolError;
use crate::goals::{BossStatus, DifficultyTier, EnergyStatus, GoalType, LootType, Metric, MetricType};
use crate::state::{Feature, QuestCandidate, WeeklyStep};

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateGoal(CreateGoalArgs),
    AddMetric(AddMetricArgs),
    SetMotivation(SetMotivationArgs),
    DefineBossStages(DefineBossStagesArgs),
    ProposeWeeklyPlan(ProposeWeeklyPlanArgs),
    ProposeDailyTasks(ProposeDailyTasksArgs),
    ProposeQuests(ProposeQuestsArgs),
    ChooseQuest(ChooseQuestArgs),
    LogQuestOutcome(LogQuestOutcomeArgs),
    FinalizeGoal,
    GetOnboardingContext,
    AdvanceOnboarding,
    UnlockFeatures(UnlockFeaturesArgs),
}

/// Tool names in catalogue order.
pub const OPERATION_NAMES: &[&str] = &[
    "create_goal",
    "add_metric",
    "set_motivation",
    "define_boss_stages",
    "propose_weekly_plan",
    "propose_daily_tasks",
    "propose_quests",
    "choose_quest",
    "log_quest_outcome",
    "finalize_goal",
    "get_onboarding_context",
    "advance_onboarding",
    "unlock_features",
];

fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    // Models sometimes send `null` for argument-less calls.
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

impl Operation {
    /// Decode a model tool call.
    pub fn from_call(name: &str, args: Value) -> Result<Self, ToolError> {
        let op = match name {
            "create_goal" => Self::CreateGoal(parse(name, args)?),
            "add_metric" => Self::AddMetric(parse(name, args)?),
            "set_motivation" => Self::SetMotivation(parse(name, args)?),
            "define_boss_stages" => Self::DefineBossStages(parse(name, args)?),
            "propose_weekly_plan" => Self::ProposeWeeklyPlan(parse(name, args)?),
            "propose_daily_tasks" => Self::ProposeDailyTasks(parse(name, args)?),
            "propose_quests" => Self::ProposeQuests(parse(name, args)?),
            "choose_quest" => Self::ChooseQuest(parse(name, args)?),
            "log_quest_outcome" => Self::LogQuestOutcome(parse(name, args)?),
            "finalize_goal" => Self::FinalizeGoal,
            "get_onboarding_context" => Self::GetOnboardingContext,
            "advance_onboarding" => Self::AdvanceOnboarding,
            "unlock_features" => Self::UnlockFeatures(parse(name, args)?),
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateGoal(_) => "create_goal",
            Self::AddMetric(_) => "add_metric",
            Self::SetMotivation(_) => "set_motivation",
            Self::DefineBossStages(_) => "define_boss_stages",
            Self::ProposeWeeklyPlan(_) => "propose_weekly_plan",
            Self::ProposeDailyTasks(_) => "propose_daily_tasks",
            Self::ProposeQuests(_) => "propose_quests",
            Self::ChooseQuest(_) => "choose_quest",
            Self::LogQuestOutcome(_) => "log_quest_outcome",
            Self::FinalizeGoal => "finalize_goal",
            Self::GetOnboardingContext => "get_onboarding_context",
            Self::AdvanceOnboarding => "advance_onboarding",
            Self::UnlockFeatures(_) => "unlock_features",
        }
    }
}

// ── Argument structs ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateGoalArgs {
    pub title: String,
    #[serde(default)]
    pub goal_type: Option<GoalType>,
    #[serde(default)]
    pub motivation: Option<String>,
}

impl CreateGoalArgs {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            goal_type: None,
            motivation: None,
        }
    }
}

/// Metric fields as the model may send them. All optional; see `resolve`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricFields {
    #[serde(default, alias = "name")]
    pub metric_name: Option<String>,
    #[serde(default, alias = "type")]
    pub metric_type: Option<String>,
    #[serde(default, alias = "target")]
    pub target_value: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, alias = "initial")]
    pub initial_value: Option<Value>,
}

/// Accept `3`, `3.5`, or `"3"`.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl MetricFields {
    /// Build a metric if name, type, target, and unit are all usable.
    pub fn resolve(&self) -> Option<Metric> {
        let metric_name = non_blank(&self.metric_name)?;
        let metric_type: MetricType =
            serde_json::from_value(Value::String(non_blank(&self.metric_type)?.to_uppercase()))
                .ok()?;
        let target_value = number(self.target_value.as_ref()?)?;
        let unit = non_blank(&self.unit)?;
        let initial_value = self.initial_value.as_ref().and_then(number);
        Some(Metric {
            metric_name,
            metric_type,
            target_value,
            unit,
            initial_value,
        })
    }
}

/// `add_metric` accepts a structured `metric_details` payload or the
/// individual fields at the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddMetricArgs {
    #[serde(default, alias = "metric")]
    pub metric_details: Option<MetricFields>,
    #[serde(flatten)]
    pub fields: MetricFields,
}

impl AddMetricArgs {
    pub fn resolve(&self) -> Option<Metric> {
        self.metric_details
            .as_ref()
            .and_then(MetricFields::resolve)
            .or_else(|| self.fields.resolve())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetMotivationArgs {
    #[serde(alias = "motivation")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossCandidate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub success_criteria: Option<String>,
    /// Explicit ordinal; otherwise assigned by arrival order.
    #[serde(default)]
    pub stage_order: Option<u32>,
    #[serde(default)]
    pub status: Option<BossStatus>,
    #[serde(default)]
    pub target_week: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefineBossStagesArgs {
    #[serde(alias = "candidates", alias = "stages")]
    pub boss_stages: Vec<BossCandidate>,
}

/// A step or task given either as a bare string or as an object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum StepInput<T> {
    Text(String),
    Detailed(T),
}

fn steps<'de, D>(deserializer: D) -> Result<Vec<WeeklyStep>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<StepInput<WeeklyStep>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|s| match s {
            StepInput::Text(title) => WeeklyStep {
                title,
                extra: Default::default(),
            },
            StepInput::Detailed(step) => step,
        })
        .collect())
}

fn candidates<'de, D>(deserializer: D) -> Result<Vec<QuestCandidate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<StepInput<QuestCandidate>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|c| match c {
            StepInput::Text(title) => QuestCandidate {
                title,
                reason: None,
                difficulty_tier: None,
                extra: Default::default(),
            },
            StepInput::Detailed(candidate) => candidate,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposeWeeklyPlanArgs {
    pub boss_id: Uuid,
    #[serde(deserialize_with = "steps")]
    pub steps: Vec<WeeklyStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposeDailyTasksArgs {
    pub weekly_step: String,
    #[serde(deserialize_with = "candidates")]
    pub tasks: Vec<QuestCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposeQuestsArgs {
    #[serde(alias = "quests", alias = "variations", deserialize_with = "candidates")]
    pub candidates: Vec<QuestCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestChoice {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty_tier: Option<DifficultyTier>,
    #[serde(default)]
    pub expected_duration_minutes: Option<u32>,
    #[serde(default)]
    pub variation_tags: Vec<String>,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub origin_prompt_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChooseQuestArgs {
    #[serde(alias = "quest")]
    pub choice: QuestChoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogQuestOutcomeArgs {
    pub quest_id: Uuid,
    /// Defaults to the conversation's goal.
    #[serde(default)]
    pub goal_id: Option<Uuid>,
    pub outcome: String,
    /// ISO-8601; a value without offset is read as UTC. Defaults to now.
    #[serde(default)]
    pub occurred_at: Option<String>,
    #[serde(default)]
    pub perceived_difficulty: Option<String>,
    #[serde(default)]
    pub energy_status: Option<EnergyStatus>,
    #[serde(default)]
    pub loot_type: Option<LootType>,
    #[serde(default)]
    pub mood_note: Option<String>,
    #[serde(default)]
    pub llm_variation_seed: Option<String>,
}

impl LogQuestOutcomeArgs {
    /// Parsed `occurred_at`, falling back to `now` when absent or unreadable.
    pub fn occurred_at_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let Some(raw) = self.occurred_at.as_deref() else {
            return now;
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return dt.with_timezone(&Utc);
        }
        match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            Ok(ndt) => ndt.and_utc(),
            Err(_) => {
                tracing::warn!(occurred_at = %raw, "Unreadable occurred_at, using now");
                now
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockFeaturesArgs {
    pub features: Vec<Feature>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn unknown_tool_is_an_error() {
        let err = Operation::from_call("delete_everything", json!({})).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "delete_everything"));
    }

    #[test]
    fn every_name_decodes() {
        let samples = [
            ("create_goal", json!({"title": "t"})),
            ("add_metric", json!({})),
            ("set_motivation", json!({"text": "why"})),
            ("define_boss_stages", json!({"boss_stages": [{"title": "b"}]})),
            (
                "propose_weekly_plan",
                json!({"boss_id": Uuid::nil(), "steps": ["a"]}),
            ),
            ("propose_daily_tasks", json!({"weekly_step": "w", "tasks": ["x"]})),
            ("propose_quests", json!({"candidates": [{"title": "q"}]})),
            ("choose_quest", json!({"choice": {"title": "q"}})),
            (
                "log_quest_outcome",
                json!({"quest_id": Uuid::nil(), "outcome": "COMPLETED"}),
            ),
            ("finalize_goal", Value::Null),
            ("get_onboarding_context", json!({})),
            ("advance_onboarding", json!({})),
            ("unlock_features", json!({"features": ["loot"]})),
        ];
        assert_eq!(samples.len(), OPERATION_NAMES.len());
        for (name, args) in samples {
            let op = Operation::from_call(name, args).unwrap();
            assert_eq!(op.name(), name);
        }
    }

    #[test]
    fn missing_required_argument_is_invalid() {
        let err = Operation::from_call("create_goal", json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn metric_from_structured_payload() {
        let args: AddMetricArgs = serde_json::from_value(json!({
            "metric_details": {"name": "주간 러닝", "type": "INCREMENTAL", "target": 3, "unit": "회"}
        }))
        .unwrap();
        let metric = args.resolve().unwrap();
        assert_eq!(metric.metric_name, "주간 러닝");
        assert_eq!(metric.metric_type, MetricType::Incremental);
        assert_eq!(metric.target_value, 3.0);
        assert_eq!(metric.unit, "회");
        assert!(metric.initial_value.is_none());
    }

    #[test]
    fn metric_from_individual_fields() {
        let args: AddMetricArgs = serde_json::from_value(json!({
            "metric_name": "체중", "metric_type": "decremental",
            "target_value": "70", "unit": "kg", "initial_value": 80
        }))
        .unwrap();
        let metric = args.resolve().unwrap();
        assert_eq!(metric.metric_type, MetricType::Decremental);
        assert_eq!(metric.target_value, 70.0);
        assert_eq!(metric.initial_value, Some(80.0));
    }

    #[test]
    fn metric_missing_field_does_not_resolve() {
        for payload in [
            json!({"name": "a", "type": "INCREMENTAL", "target": 3}),
            json!({"name": "a", "type": "SIDEWAYS", "target": 3, "unit": "u"}),
            json!({"name": " ", "type": "INCREMENTAL", "target": 3, "unit": "u"}),
            json!({"name": "a", "type": "INCREMENTAL", "target": "many", "unit": "u"}),
        ] {
            let args: AddMetricArgs = serde_json::from_value(payload.clone()).unwrap();
            assert!(args.resolve().is_none(), "{payload} should not resolve");
        }
    }

    #[test]
    fn string_steps_become_titled_steps() {
        let args: ProposeWeeklyPlanArgs = serde_json::from_value(json!({
            "boss_id": Uuid::nil(),
            "steps": ["월: 2km", {"title": "수: 3km", "minutes": 25}]
        }))
        .unwrap();
        assert_eq!(args.steps[0].title, "월: 2km");
        assert_eq!(args.steps[1].extra["minutes"], 25);
    }

    #[test]
    fn occurred_at_parsing() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let mut args: LogQuestOutcomeArgs = serde_json::from_value(json!({
            "quest_id": Uuid::nil(), "outcome": "COMPLETED"
        }))
        .unwrap();
        assert_eq!(args.occurred_at_or(now), now);

        args.occurred_at = Some("2025-04-30T08:00:00".into());
        assert_eq!(
            args.occurred_at_or(now),
            Utc.with_ymd_and_hms(2025, 4, 30, 8, 0, 0).unwrap()
        );

        args.occurred_at = Some("2025-04-30T08:00:00+09:00".into());
        assert_eq!(
            args.occurred_at_or(now),
            Utc.with_ymd_and_hms(2025, 4, 29, 23, 0, 0).unwrap()
        );
    }
}
