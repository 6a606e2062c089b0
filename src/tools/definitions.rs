//! JSON-schema tool definitions offered to the model.

use serde_json::{Value, json};

use crate::llm::ToolDefinition;

fn tool(name: &str, description: &str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

fn no_params() -> Value {
    json!({"type": "object", "properties": {}})
}

fn candidate_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "reason": {"type": "string", "description": "Why this variation suits the user"},
            "difficulty_tier": {"type": "string", "enum": ["EASY", "NORMAL", "HARD"]}
        },
        "required": ["title"]
    })
}

/// Definitions for every operation, in catalogue order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "create_goal",
            "Create a new goal for this conversation. Always the first step.",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Short, descriptive goal title"},
                    "goal_type": {"type": "string", "enum": ["ONE_TIME", "RECURRING"]},
                    "motivation": {"type": "string"}
                },
                "required": ["title"]
            }),
        ),
        tool(
            "add_metric",
            "Add a measurable metric to the current goal. Only call once name, type, target value, and unit are all known.",
            json!({
                "type": "object",
                "properties": {
                    "metric_name": {"type": "string", "description": "e.g. Weight, Running Distance"},
                    "metric_type": {"type": "string", "enum": ["INCREMENTAL", "DECREMENTAL"]},
                    "target_value": {"type": "number"},
                    "unit": {"type": "string", "description": "e.g. kg, km, pages"},
                    "initial_value": {"type": "number"}
                },
                "required": ["metric_name", "metric_type", "target_value", "unit"]
            }),
        ),
        tool(
            "set_motivation",
            "Record why the user wants to achieve this goal.",
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }),
        ),
        tool(
            "define_boss_stages",
            "Break the goal into major milestones (boss stages), in order.",
            json!({
                "type": "object",
                "properties": {
                    "boss_stages": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {"type": "string"},
                                "description": {"type": "string"},
                                "success_criteria": {"type": "string"},
                                "target_week": {"type": "integer", "minimum": 1}
                            },
                            "required": ["title"]
                        }
                    }
                },
                "required": ["boss_stages"]
            }),
        ),
        tool(
            "propose_weekly_plan",
            "Set the ordered weekly steps preparing for one boss stage. Replaces any earlier plan for that stage.",
            json!({
                "type": "object",
                "properties": {
                    "boss_id": {"type": "string", "description": "Boss stage id returned by define_boss_stages"},
                    "steps": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["boss_id", "steps"]
            }),
        ),
        tool(
            "propose_daily_tasks",
            "Offer daily task options for one weekly step.",
            json!({
                "type": "object",
                "properties": {
                    "weekly_step": {"type": "string"},
                    "tasks": {"type": "array", "items": candidate_schema()}
                },
                "required": ["weekly_step", "tasks"]
            }),
        ),
        tool(
            "propose_quests",
            "Offer quest variations to choose from. Locked until the loot feature is unlocked.",
            json!({
                "type": "object",
                "properties": {
                    "candidates": {"type": "array", "items": candidate_schema()}
                },
                "required": ["candidates"]
            }),
        ),
        tool(
            "choose_quest",
            "Accept one quest. Persists it and clears the pending variations.",
            json!({
                "type": "object",
                "properties": {
                    "choice": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "description": {"type": "string"},
                            "difficulty_tier": {"type": "string", "enum": ["EASY", "NORMAL", "HARD"]},
                            "expected_duration_minutes": {"type": "integer"},
                            "variation_tags": {"type": "array", "items": {"type": "string"}},
                            "is_custom": {"type": "boolean"}
                        },
                        "required": ["title"]
                    }
                },
                "required": ["choice"]
            }),
        ),
        tool(
            "log_quest_outcome",
            "Record what happened when the user attempted a quest.",
            json!({
                "type": "object",
                "properties": {
                    "quest_id": {"type": "string"},
                    "goal_id": {"type": "string"},
                    "outcome": {"type": "string", "description": "e.g. COMPLETED, FAILED"},
                    "occurred_at": {"type": "string", "description": "ISO-8601 timestamp"},
                    "perceived_difficulty": {"type": "string"},
                    "energy_status": {"type": "string", "enum": ["READY_FOR_BOSS", "KEEPING_PACE", "NEEDS_POTION"]},
                    "loot_type": {"type": "string", "enum": ["ACHIEVEMENT", "INSIGHT", "EMOTION"]},
                    "mood_note": {"type": "string"}
                },
                "required": ["quest_id", "outcome"]
            }),
        ),
        tool(
            "finalize_goal",
            "Finish goal setting once the user is happy with the goal.",
            no_params(),
        ),
        tool(
            "get_onboarding_context",
            "Read the onboarding stage and which planning features are unlocked.",
            no_params(),
        ),
        tool(
            "advance_onboarding",
            "Move to the next onboarding stage, unlocking its feature.",
            no_params(),
        ),
        tool(
            "unlock_features",
            "Unlock planning features directly.",
            json!({
                "type": "object",
                "properties": {
                    "features": {
                        "type": "array",
                        "items": {"type": "string", "enum": ["loot", "energy", "boss"]}
                    }
                },
                "required": ["features"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::operation::OPERATION_NAMES;

    #[test]
    fn definitions_cover_every_operation() {
        let defs = tool_definitions();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, OPERATION_NAMES);
    }

    #[test]
    fn schemas_are_objects() {
        for def in tool_definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }
}
