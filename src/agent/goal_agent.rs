//! Goal agent: the operation catalogue over the conversation state store.
//!
//! Every operation takes the conversation id first. Durable writes always
//! happen before the snapshot is updated, so a snapshot never names a row
//! that does not exist.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AgentError;
use crate::goals::{BossStage, Goal, Quest, QuestLog};
use crate::state::{
    ConversationSnapshot, Feature, FeatureFlags, OnboardingStage, QuestCandidate, StateStore,
    WeeklyStep,
};
use crate::store::Database;
use crate::tools::{
    AddMetricArgs, BossCandidate, CreateGoalArgs, LogQuestOutcomeArgs, Operation, QuestChoice,
};

/// Reason given when a variation has none.
pub const DEFAULT_VARIATION_REASON: &str = "기본 추천 변주";
/// Difficulty given when a variation has none.
pub const DEFAULT_VARIATION_DIFFICULTY: &str = "NORMAL";
/// Reason code returned while `propose_quests` is gated.
pub const LOCKED_REASON: &str = "ONBOARDING_STAGE_LOCKED";

/// Onboarding view returned by `get_onboarding_context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OnboardingContext {
    pub onboarding_stage: OnboardingStage,
    pub feature_flags: FeatureFlags,
}

/// Outcome of `propose_quests`.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestProposal {
    Offered(Vec<QuestCandidate>),
    Locked,
}

pub struct GoalAgent {
    db: Arc<dyn Database>,
    store: Arc<dyn StateStore>,
    user_id: String,
}

impl GoalAgent {
    pub fn new(db: Arc<dyn Database>, store: Arc<dyn StateStore>, user_id: impl Into<String>) -> Self {
        Self {
            db,
            store,
            user_id: user_id.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn db(&self) -> &Arc<dyn Database> {
        &self.db
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn active(&self, conv: &str) -> Result<ConversationSnapshot, AgentError> {
        self.store
            .read(conv)
            .await
            .ok_or_else(|| AgentError::NoActiveConversation {
                conversation_id: conv.to_string(),
            })
    }

    // ── Goal ────────────────────────────────────────────────────────

    pub async fn create_goal(
        &self,
        conv: &str,
        args: CreateGoalArgs,
    ) -> Result<ConversationSnapshot, AgentError> {
        let title = args.title.trim();
        if title.is_empty() {
            return Err(AgentError::InvalidTitle);
        }
        if self.store.read(conv).await.is_some() {
            return Err(AgentError::DuplicateConversation {
                conversation_id: conv.to_string(),
            });
        }

        let preferences = self.db.get_user_preference(&self.user_id).await?;
        let mut goal = Goal::new(&self.user_id, title);
        if let Some(goal_type) = args.goal_type {
            goal = goal.with_goal_type(goal_type);
        }
        if let Some(motivation) = args.motivation.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            goal = goal.with_motivation(motivation);
        }
        self.db.create_goal(&goal).await?;

        let mut snapshot = ConversationSnapshot::new(conv, goal.goal_id, title, preferences);
        snapshot.goal_type = goal.goal_type;
        snapshot.motivation = goal.motivation.clone();
        self.store.start(conv, snapshot.clone()).await?;

        info!(conversation_id = %conv, goal_id = %goal.goal_id, title = %title, "Goal created");
        Ok(snapshot)
    }

    /// Append a metric when the payload fully resolves; otherwise a silent no-op.
    pub async fn add_metric(
        &self,
        conv: &str,
        args: &AddMetricArgs,
    ) -> Result<ConversationSnapshot, AgentError> {
        let mut snapshot = self.active(conv).await?;
        match args.resolve() {
            Some(metric) => {
                debug!(conversation_id = %conv, metric = %metric.metric_name, "Metric added");
                snapshot.metrics.push(metric);
                self.store.write(conv, snapshot.clone()).await?;
            }
            None => {
                debug!(conversation_id = %conv, "add_metric missing required fields, ignoring");
            }
        }
        Ok(snapshot)
    }

    pub async fn set_motivation(
        &self,
        conv: &str,
        text: &str,
    ) -> Result<ConversationSnapshot, AgentError> {
        let mut snapshot = self.active(conv).await?;
        snapshot.motivation = Some(text.to_string());
        self.store.write(conv, snapshot.clone()).await?;
        Ok(snapshot)
    }

    /// Write the final goal row, log the snapshot, and drop the conversation.
    pub async fn finalize_goal(&self, conv: &str) -> Result<bool, AgentError> {
        let snapshot = self.active(conv).await?;
        self.db
            .update_goal_final(
                snapshot.goal_id,
                snapshot.goal_type,
                snapshot.motivation.as_deref(),
            )
            .await?;

        info!(
            conversation_id = %conv,
            goal_id = %snapshot.goal_id,
            metrics = snapshot.metrics.len(),
            boss_stages = snapshot.boss_stage_ids.len(),
            quests = snapshot.accepted_quest_ids.len(),
            "Goal finalized"
        );
        debug!(
            snapshot = %serde_json::to_string(&snapshot).unwrap_or_default(),
            "Final snapshot"
        );
        self.store.end(conv).await;
        Ok(true)
    }

    // ── Boss stages and plans ───────────────────────────────────────

    /// Create boss stages, numbering them after the ones already defined.
    pub async fn define_boss_stages(
        &self,
        conv: &str,
        candidates: Vec<BossCandidate>,
    ) -> Result<Vec<BossStage>, AgentError> {
        let mut snapshot = self.active(conv).await?;
        let existing = snapshot.boss_stage_ids.len();
        let mut created = Vec::with_capacity(candidates.len());

        for (i, candidate) in candidates.into_iter().enumerate() {
            let stage = BossStage {
                boss_id: Uuid::new_v4(),
                goal_id: snapshot.goal_id,
                title: candidate.title,
                description: candidate.description,
                success_criteria: candidate.success_criteria,
                stage_order: candidate
                    .stage_order
                    .unwrap_or((existing + i + 1) as u32),
                status: candidate.status.unwrap_or_default(),
                target_week: candidate.target_week,
                created_at: Utc::now(),
            };
            self.db.create_boss_stage(&stage).await?;

            snapshot.boss_stage_ids.push(stage.boss_id);
            snapshot
                .boss_titles
                .insert(stage.boss_id, stage.title.clone());
            self.store.write(conv, snapshot.clone()).await?;
            created.push(stage);
        }

        info!(conversation_id = %conv, count = created.len(), "Boss stages defined");
        Ok(created)
    }

    /// Replace the weekly plan for one boss stage.
    pub async fn propose_weekly_plan(
        &self,
        conv: &str,
        boss_id: Uuid,
        steps: Vec<WeeklyStep>,
    ) -> Result<Vec<WeeklyStep>, AgentError> {
        let mut snapshot = self.active(conv).await?;
        if !snapshot.boss_titles.contains_key(&boss_id) {
            warn!(conversation_id = %conv, boss_id = %boss_id, "Weekly plan for a boss stage not defined here");
        }
        snapshot.weekly_plan.insert(boss_id, steps.clone());
        self.store.write(conv, snapshot).await?;
        Ok(steps)
    }

    pub async fn propose_daily_tasks(
        &self,
        conv: &str,
        weekly_step: &str,
        tasks: Vec<QuestCandidate>,
    ) -> Result<Vec<QuestCandidate>, AgentError> {
        let mut snapshot = self.active(conv).await?;
        snapshot.current_variations = tasks.clone();
        snapshot.last_weekly_step = Some(weekly_step.to_string());
        self.store.write(conv, snapshot).await?;
        Ok(tasks)
    }

    // ── Quests ──────────────────────────────────────────────────────

    /// Offer quest variations; gated on the loot feature.
    pub async fn propose_quests(
        &self,
        conv: &str,
        candidates: Vec<QuestCandidate>,
    ) -> Result<QuestProposal, AgentError> {
        let mut snapshot = self.active(conv).await?;
        if !snapshot.feature_flags.is_enabled(Feature::Loot) {
            debug!(conversation_id = %conv, "propose_quests locked");
            return Ok(QuestProposal::Locked);
        }

        let variations: Vec<QuestCandidate> = candidates
            .into_iter()
            .map(|mut c| {
                c.reason.get_or_insert_with(|| DEFAULT_VARIATION_REASON.to_string());
                c.difficulty_tier
                    .get_or_insert_with(|| DEFAULT_VARIATION_DIFFICULTY.to_string());
                c
            })
            .collect();
        snapshot.current_variations = variations.clone();
        self.store.write(conv, snapshot).await?;
        Ok(QuestProposal::Offered(variations))
    }

    pub async fn choose_quest(&self, conv: &str, choice: QuestChoice) -> Result<Quest, AgentError> {
        let mut snapshot = self.active(conv).await?;
        let quest = Quest {
            quest_id: Uuid::new_v4(),
            goal_id: snapshot.goal_id,
            title: choice.title,
            description: choice.description,
            difficulty_tier: choice.difficulty_tier.unwrap_or_default(),
            expected_duration_minutes: choice.expected_duration_minutes,
            variation_tags: choice.variation_tags,
            is_custom: choice.is_custom,
            origin_prompt_hash: choice.origin_prompt_hash,
            created_at: Utc::now(),
        };
        self.db.create_quest(&quest).await?;

        snapshot.accepted_quest_ids.push(quest.quest_id);
        snapshot.current_variations.clear();
        self.store.write(conv, snapshot).await?;

        info!(conversation_id = %conv, quest_id = %quest.quest_id, title = %quest.title, "Quest accepted");
        Ok(quest)
    }

    pub async fn log_quest_outcome(
        &self,
        conv: &str,
        args: LogQuestOutcomeArgs,
    ) -> Result<QuestLog, AgentError> {
        let mut snapshot = self.active(conv).await?;
        let log = QuestLog {
            log_id: Uuid::new_v4(),
            quest_id: args.quest_id,
            goal_id: args.goal_id.unwrap_or(snapshot.goal_id),
            occurred_at: args.occurred_at_or(Utc::now()),
            outcome: args.outcome,
            perceived_difficulty: args.perceived_difficulty,
            energy_status: args.energy_status,
            loot_type: args.loot_type,
            mood_note: args.mood_note,
            llm_variation_seed: args.llm_variation_seed,
        };
        self.db.log_quest_event(&log).await?;

        snapshot.quest_log_ids.push(log.log_id);
        if log.energy_status.is_some() {
            snapshot.last_energy = log.energy_status;
        }
        if log.loot_type.is_some() {
            snapshot.last_loot = log.loot_type;
        }
        if log.mood_note.is_some() {
            snapshot.last_mood = log.mood_note.clone();
        }
        self.store.write(conv, snapshot).await?;

        info!(conversation_id = %conv, log_id = %log.log_id, outcome = %log.outcome, "Quest outcome logged");
        Ok(log)
    }

    // ── Onboarding ──────────────────────────────────────────────────

    /// Stage and flags; defaults when the conversation is not active.
    pub async fn get_onboarding_context(&self, conv: &str) -> OnboardingContext {
        match self.store.read(conv).await {
            Some(snapshot) => OnboardingContext {
                onboarding_stage: snapshot.onboarding_stage,
                feature_flags: snapshot.feature_flags,
            },
            None => OnboardingContext {
                onboarding_stage: OnboardingStage::default(),
                feature_flags: FeatureFlags::default(),
            },
        }
    }

    /// Move to the next stage. At the last stage this changes nothing.
    pub async fn advance_onboarding(&self, conv: &str) -> Result<OnboardingContext, AgentError> {
        let mut snapshot = self.active(conv).await?;
        match snapshot.advance() {
            Ok(stage) => {
                info!(conversation_id = %conv, stage = %stage, "Onboarding advanced");
                self.store.write(conv, snapshot.clone()).await?;
            }
            Err(reason) => debug!(conversation_id = %conv, %reason, "Onboarding not advanced"),
        }
        Ok(OnboardingContext {
            onboarding_stage: snapshot.onboarding_stage,
            feature_flags: snapshot.feature_flags,
        })
    }

    /// Switch features on. Never switches any off.
    pub async fn unlock_features(
        &self,
        conv: &str,
        features: &[Feature],
    ) -> Result<OnboardingContext, AgentError> {
        let mut snapshot = self.active(conv).await?;
        for feature in features {
            snapshot.feature_flags.enable(*feature);
        }
        self.store.write(conv, snapshot.clone()).await?;
        Ok(OnboardingContext {
            onboarding_stage: snapshot.onboarding_stage,
            feature_flags: snapshot.feature_flags,
        })
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Run one operation and render its tool result.
    ///
    /// Recoverable agent errors become `{"status":"error","reason":...}`;
    /// storage failures are returned as `Err`.
    pub async fn dispatch(&self, conv: &str, op: Operation) -> Result<Value, AgentError> {
        let tool = op.name();
        debug!(conversation_id = %conv, tool, "Dispatching operation");

        match self.run(conv, op).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_recoverable() => {
                debug!(conversation_id = %conv, tool, error = %e, "Operation rejected");
                Ok(json!({
                    "status": "error",
                    "reason": e.reason_code(),
                    "message": e.to_string(),
                }))
            }
            Err(e) => Err(e),
        }
    }

    async fn run(&self, conv: &str, op: Operation) -> Result<Value, AgentError> {
        let value = match op {
            Operation::CreateGoal(args) => to_value(&self.create_goal(conv, args).await?),
            Operation::AddMetric(args) => to_value(&self.add_metric(conv, &args).await?),
            Operation::SetMotivation(args) => {
                to_value(&self.set_motivation(conv, &args.text).await?)
            }
            Operation::DefineBossStages(args) => {
                let created = self.define_boss_stages(conv, args.boss_stages).await?;
                json!({"status": "ok", "boss_stages": created})
            }
            Operation::ProposeWeeklyPlan(args) => {
                let steps = self
                    .propose_weekly_plan(conv, args.boss_id, args.steps)
                    .await?;
                json!({"status": "ok", "weekly_plan": steps})
            }
            Operation::ProposeDailyTasks(args) => {
                let tasks = self
                    .propose_daily_tasks(conv, &args.weekly_step, args.tasks)
                    .await?;
                json!({"status": "ok", "daily_tasks": tasks})
            }
            Operation::ProposeQuests(args) => match self.propose_quests(conv, args.candidates).await? {
                QuestProposal::Offered(variations) => {
                    json!({"status": "ok", "variations": variations})
                }
                QuestProposal::Locked => json!({"status": "locked", "reason": LOCKED_REASON}),
            },
            Operation::ChooseQuest(args) => {
                let quest = self.choose_quest(conv, args.choice).await?;
                json!({"status": "ok", "quest": quest})
            }
            Operation::LogQuestOutcome(args) => {
                let log = self.log_quest_outcome(conv, args).await?;
                json!({"status": "ok", "log": log})
            }
            Operation::FinalizeGoal => json!(self.finalize_goal(conv).await?),
            Operation::GetOnboardingContext => to_value(&self.get_onboarding_context(conv).await),
            Operation::AdvanceOnboarding => to_value(&self.advance_onboarding(conv).await?),
            Operation::UnlockFeatures(args) => {
                to_value(&self.unlock_features(conv, &args.features).await?)
            }
        };
        Ok(value)
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{BossStatus, EnergyStatus, LootType, MetricType};
    use crate::state::InMemoryStateStore;
    use crate::store::LibSqlBackend;
    use serde_json::json;

    async fn agent() -> GoalAgent {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        GoalAgent::new(db, Arc::new(InMemoryStateStore::new()), "tester")
    }

    fn candidate(title: &str) -> BossCandidate {
        BossCandidate {
            title: title.into(),
            description: None,
            success_criteria: None,
            stage_order: None,
            status: None,
            target_week: None,
        }
    }

    fn metric_args(value: Value) -> AddMetricArgs {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn every_operation_rejects_unknown_conversation() {
        let agent = agent().await;
        let ops = [
            Operation::from_call("add_metric", json!({})).unwrap(),
            Operation::from_call("set_motivation", json!({"text": "x"})).unwrap(),
            Operation::from_call("define_boss_stages", json!({"boss_stages": []})).unwrap(),
            Operation::from_call("propose_weekly_plan", json!({"boss_id": Uuid::nil(), "steps": []}))
                .unwrap(),
            Operation::from_call("propose_daily_tasks", json!({"weekly_step": "w", "tasks": []}))
                .unwrap(),
            Operation::from_call("propose_quests", json!({"candidates": []})).unwrap(),
            Operation::from_call("choose_quest", json!({"choice": {"title": "q"}})).unwrap(),
            Operation::from_call(
                "log_quest_outcome",
                json!({"quest_id": Uuid::nil(), "outcome": "COMPLETED"}),
            )
            .unwrap(),
            Operation::FinalizeGoal,
            Operation::AdvanceOnboarding,
            Operation::from_call("unlock_features", json!({"features": ["loot"]})).unwrap(),
        ];
        for op in ops {
            let name = op.name();
            let result = agent.dispatch("ghost", op).await.unwrap();
            assert_eq!(result["status"], "error", "{name}");
            assert_eq!(result["reason"], "NO_ACTIVE_CONVERSATION", "{name}");
        }
    }

    #[tokio::test]
    async fn create_goal_rejects_blank_title() {
        let agent = agent().await;
        let err = agent
            .create_goal("c1", CreateGoalArgs::titled("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidTitle));
        assert!(agent.store().read("c1").await.is_none());
    }

    #[tokio::test]
    async fn create_goal_twice_is_rejected_without_orphan_row() {
        let agent = agent().await;
        let first = agent
            .create_goal("c1", CreateGoalArgs::titled("독서"))
            .await
            .unwrap();
        let err = agent
            .create_goal("c1", CreateGoalArgs::titled("러닝"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicateConversation { .. }));
        let snapshot = agent.store().read("c1").await.unwrap();
        assert_eq!(snapshot.goal_id, first.goal_id);
        assert_eq!(snapshot.goal_title, "독서");
    }

    #[tokio::test]
    async fn create_goal_starts_locked_and_is_durable() {
        let agent = agent().await;
        let snapshot = agent
            .create_goal("c1", CreateGoalArgs::titled("  5km 습관 "))
            .await
            .unwrap();
        assert_eq!(snapshot.goal_title, "5km 습관");

        let ctx = agent.get_onboarding_context("c1").await;
        assert_eq!(ctx.onboarding_stage, OnboardingStage::Initial);
        assert_eq!(ctx.feature_flags, FeatureFlags::default());

        let goal = agent.db().get_goal(snapshot.goal_id).await.unwrap().unwrap();
        assert_eq!(goal.user_id, "tester");
        assert_eq!(goal.title, "5km 습관");
    }

    #[tokio::test]
    async fn add_metric_requires_all_fields() {
        let agent = agent().await;
        agent
            .create_goal("c1", CreateGoalArgs::titled("체중 감량"))
            .await
            .unwrap();

        let unchanged = agent
            .add_metric("c1", &metric_args(json!({"name": "체중", "type": "DECREMENTAL", "target": 70})))
            .await
            .unwrap();
        assert!(unchanged.metrics.is_empty());

        let changed = agent
            .add_metric(
                "c1",
                &metric_args(json!({"name": "체중", "type": "DECREMENTAL", "target": 70, "unit": "kg"})),
            )
            .await
            .unwrap();
        assert_eq!(changed.metrics.len(), 1);
        assert_eq!(changed.metrics[0].metric_type, MetricType::Decremental);
        assert_eq!(agent.store().read("c1").await.unwrap().metrics.len(), 1);
    }

    #[tokio::test]
    async fn boss_ordinals_continue_across_calls() {
        let agent = agent().await;
        let snapshot = agent
            .create_goal("c1", CreateGoalArgs::titled("마라톤"))
            .await
            .unwrap();

        let first = agent
            .define_boss_stages("c1", vec![candidate("5km"), candidate("10km")])
            .await
            .unwrap();
        let second = agent
            .define_boss_stages("c1", vec![candidate("하프"), candidate("풀"), candidate("회복")])
            .await
            .unwrap();

        let orders: Vec<u32> = first.iter().chain(&second).map(|s| s.stage_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        assert!(first.iter().all(|s| s.status == BossStatus::Planned));

        let stored = agent.db().list_boss_stages(snapshot.goal_id).await.unwrap();
        assert_eq!(stored.len(), 5);
        let cached = agent.store().read("c1").await.unwrap();
        assert_eq!(cached.boss_stage_ids.len(), 5);
        assert_eq!(cached.boss_titles[&first[0].boss_id], "5km");
    }

    #[tokio::test]
    async fn weekly_plan_replaces_previous_plan() {
        let agent = agent().await;
        agent
            .create_goal("c1", CreateGoalArgs::titled("마라톤"))
            .await
            .unwrap();
        let stages = agent
            .define_boss_stages("c1", vec![candidate("5km")])
            .await
            .unwrap();
        let boss_id = stages[0].boss_id;

        let step = |t: &str| WeeklyStep {
            title: t.into(),
            extra: Default::default(),
        };
        agent
            .propose_weekly_plan("c1", boss_id, vec![step("a"), step("b")])
            .await
            .unwrap();
        agent
            .propose_weekly_plan("c1", boss_id, vec![step("c")])
            .await
            .unwrap();

        let snapshot = agent.store().read("c1").await.unwrap();
        assert_eq!(snapshot.weekly_plan[&boss_id], vec![step("c")]);
    }

    #[tokio::test]
    async fn propose_quests_locked_until_loot_unlocked() {
        let agent = agent().await;
        agent
            .create_goal("c1", CreateGoalArgs::titled("마라톤"))
            .await
            .unwrap();

        let locked = agent
            .dispatch(
                "c1",
                Operation::from_call("propose_quests", json!({"candidates": [{"title": "3km"}]}))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(locked, json!({"status": "locked", "reason": "ONBOARDING_STAGE_LOCKED"}));

        agent.unlock_features("c1", &[Feature::Loot]).await.unwrap();
        let offered = agent
            .dispatch(
                "c1",
                Operation::from_call(
                    "propose_quests",
                    json!({"candidates": [
                        {"title": "3km"},
                        {"title": "인터벌", "reason": "속도", "difficulty_tier": "HARD", "minutes": 30}
                    ]}),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(offered["status"], "ok");
        let variations = offered["variations"].as_array().unwrap();
        assert_eq!(variations[0]["reason"], DEFAULT_VARIATION_REASON);
        assert_eq!(variations[0]["difficulty_tier"], "NORMAL");
        assert_eq!(variations[1]["reason"], "속도");
        assert_eq!(variations[1]["difficulty_tier"], "HARD");
        assert_eq!(variations[1]["minutes"], 30);
    }

    #[tokio::test]
    async fn choose_quest_persists_and_clears_variations() {
        let agent = agent().await;
        agent
            .create_goal("c1", CreateGoalArgs::titled("마라톤"))
            .await
            .unwrap();
        agent
            .propose_daily_tasks(
                "c1",
                "1주차",
                vec![QuestCandidate {
                    title: "2km".into(),
                    reason: None,
                    difficulty_tier: None,
                    extra: Default::default(),
                }],
            )
            .await
            .unwrap();

        let snapshot = agent.store().read("c1").await.unwrap();
        assert_eq!(snapshot.current_variations.len(), 1);
        assert_eq!(snapshot.last_weekly_step.as_deref(), Some("1주차"));

        let quest = agent
            .choose_quest(
                "c1",
                serde_json::from_value(json!({"title": "2km", "variation_tags": ["morning"]}))
                    .unwrap(),
            )
            .await
            .unwrap();
        let snapshot = agent.store().read("c1").await.unwrap();
        assert!(snapshot.current_variations.is_empty());
        assert_eq!(snapshot.accepted_quest_ids, vec![quest.quest_id]);
        assert!(agent.db().get_quest(quest.quest_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn log_outcome_updates_tone_cache() {
        let agent = agent().await;
        let snapshot = agent
            .create_goal("c1", CreateGoalArgs::titled("마라톤"))
            .await
            .unwrap();
        let quest = agent
            .choose_quest("c1", serde_json::from_value(json!({"title": "2km"})).unwrap())
            .await
            .unwrap();

        let log = agent
            .log_quest_outcome(
                "c1",
                serde_json::from_value(json!({
                    "quest_id": quest.quest_id,
                    "outcome": "COMPLETED",
                    "energy_status": "NEEDS_POTION",
                    "loot_type": "EMOTION",
                    "mood_note": "지쳤지만 뿌듯"
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(log.goal_id, snapshot.goal_id);

        let cached = agent.store().read("c1").await.unwrap();
        assert_eq!(cached.quest_log_ids, vec![log.log_id]);
        assert_eq!(cached.last_energy, Some(EnergyStatus::NeedsPotion));
        assert_eq!(cached.last_loot, Some(LootType::Emotion));
        assert_eq!(cached.last_mood.as_deref(), Some("지쳤지만 뿌듯"));

        let stored = agent
            .db()
            .list_recent_quest_logs(snapshot.goal_id, 5)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn finalize_writes_motivation_and_ends() {
        let agent = agent().await;
        let snapshot = agent
            .create_goal("c1", CreateGoalArgs::titled("독서"))
            .await
            .unwrap();
        agent.set_motivation("c1", "성장").await.unwrap();

        let result = agent.dispatch("c1", Operation::FinalizeGoal).await.unwrap();
        assert_eq!(result, json!(true));
        assert!(agent.store().read("c1").await.is_none());

        let goal = agent.db().get_goal(snapshot.goal_id).await.unwrap().unwrap();
        assert_eq!(goal.motivation.as_deref(), Some("성장"));

        // The id is free again.
        agent
            .create_goal("c1", CreateGoalArgs::titled("다음 목표"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn onboarding_advances_and_stays_monotone() {
        let agent = agent().await;
        agent
            .create_goal("c1", CreateGoalArgs::titled("마라톤"))
            .await
            .unwrap();

        let ctx = agent.advance_onboarding("c1").await.unwrap();
        assert_eq!(ctx.onboarding_stage, OnboardingStage::Planning);
        assert!(ctx.feature_flags.boss);

        agent.unlock_features("c1", &[Feature::Energy]).await.unwrap();
        agent.advance_onboarding("c1").await.unwrap();
        let ctx = agent.advance_onboarding("c1").await.unwrap();
        assert_eq!(ctx.onboarding_stage, OnboardingStage::Reflecting);

        let again = agent.advance_onboarding("c1").await.unwrap();
        assert_eq!(again, ctx);
        assert!(again.feature_flags.loot && again.feature_flags.energy && again.feature_flags.boss);
    }

    #[tokio::test]
    async fn onboarding_context_defaults_without_conversation() {
        let agent = agent().await;
        let value = agent
            .dispatch("nobody", Operation::GetOnboardingContext)
            .await
            .unwrap();
        assert_eq!(
            value,
            json!({
                "onboarding_stage": "initial",
                "feature_flags": {"loot": false, "energy": false, "boss": false}
            })
        );
    }
}
