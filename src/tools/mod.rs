//! Goal-agent tools: the operation catalogue and its schemas.

pub mod definitions;
pub mod operation;

pub use definitions::tool_definitions;
pub use operation::{
    AddMetricArgs, BossCandidate, ChooseQuestArgs, CreateGoalArgs, DefineBossStagesArgs,
    LogQuestOutcomeArgs, MetricFields, OPERATION_NAMES, Operation, ProposeDailyTasksArgs,
    ProposeQuestsArgs, ProposeWeeklyPlanArgs, QuestChoice, SetMotivationArgs, UnlockFeaturesArgs,
};
