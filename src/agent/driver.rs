//! Dialogue drivers: turn one user line into one coach reply.
//!
//! `LlmDriver` runs the model tool loop (model → tools → model …) against the
//! goal agent. `MockDriver` (see `mock`) answers offline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::agent::goal_agent::GoalAgent;
use crate::error::{Error, LlmError, ToolError};
use crate::llm::{
    ChatMessage, LlmProvider, ModelStep, Reasoning, ToolCall, UsageLog, UsageRecord,
};
use crate::tools::{Operation, tool_definitions};

/// Produces the coach's reply for one user turn.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, conversation_id: &str, content: &str) -> Result<String, Error>;

    /// Forget whatever was kept for a conversation that is over.
    async fn end_conversation(&self, _conversation_id: &str) {}
}

/// Default ceiling on model→tool rounds within one turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

type History = Arc<Mutex<Vec<ChatMessage>>>;

/// Result of running one tool call.
struct ToolOutcome {
    content: String,
    /// Shown to the user ahead of the model's reply.
    notice: Option<String>,
    /// The call finalized the goal and ended the conversation.
    ends_conversation: bool,
}

pub struct LlmDriver {
    agent: Arc<GoalAgent>,
    reasoning: Reasoning,
    usage: UsageLog,
    max_tool_rounds: usize,
    /// One lock per conversation; the map lock is only held to look one up.
    histories: Mutex<HashMap<String, History>>,
}

impl LlmDriver {
    pub fn new(
        agent: Arc<GoalAgent>,
        llm: Arc<dyn LlmProvider>,
        system_prompt: &str,
        usage: UsageLog,
    ) -> Self {
        Self {
            agent,
            reasoning: Reasoning::new(llm, system_prompt, tool_definitions()),
            usage,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            histories: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    /// Messages committed so far in a conversation.
    pub async fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        let entry = self.histories.lock().await.get(conversation_id).cloned();
        match entry {
            Some(history) => history.lock().await.clone(),
            None => Vec::new(),
        }
    }

    async fn history_entry(&self, conversation_id: &str) -> History {
        self.histories
            .lock()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }

    /// Run one tool call. Decode failures become an error result for the
    /// model; an unknown tool name is also returned as a notice for the user.
    async fn execute(&self, conversation_id: &str, tc: &ToolCall) -> Result<ToolOutcome, Error> {
        let op = match Operation::from_call(&tc.name, tc.arguments.clone()) {
            Ok(op) => op,
            Err(ToolError::UnknownTool(name)) => {
                warn!(conversation_id = %conversation_id, tool = %name, "Model called an unknown tool");
                let result = json!({
                    "status": "error",
                    "reason": "UNKNOWN_TOOL",
                    "message": format!("Unknown tool: {name}"),
                });
                return Ok(ToolOutcome {
                    content: result.to_string(),
                    notice: Some(format!("알 수 없는 도구 요청: {name}")),
                    ends_conversation: false,
                });
            }
            Err(e @ ToolError::InvalidArguments { .. }) => {
                warn!(conversation_id = %conversation_id, tool = %tc.name, error = %e, "Invalid tool arguments");
                let result = json!({
                    "status": "error",
                    "reason": "INVALID_ARGUMENTS",
                    "message": e.to_string(),
                });
                return Ok(ToolOutcome {
                    content: result.to_string(),
                    notice: None,
                    ends_conversation: false,
                });
            }
        };

        let finalizing = matches!(op, Operation::FinalizeGoal);
        let value = self.agent.dispatch(conversation_id, op).await?;
        Ok(ToolOutcome {
            ends_conversation: finalizing && value == Value::Bool(true),
            content: value.to_string(),
            notice: None,
        })
    }
}

#[async_trait]
impl Responder for LlmDriver {
    async fn respond(&self, conversation_id: &str, content: &str) -> Result<String, Error> {
        let entry = self.history_entry(conversation_id).await;
        let mut history = entry.lock().await;

        // Work on a copy. A failed turn must not leave tool calls without
        // results in the history.
        let mut turn = history.clone();
        turn.push(ChatMessage::user(content));

        let mut notices = Vec::new();
        let mut ended = false;
        for round in 0..self.max_tool_rounds {
            let output = self.reasoning.step(&turn).await?;
            self.usage
                .append(&UsageRecord::new(
                    self.reasoning.model_name(),
                    output.input_tokens,
                    output.output_tokens,
                ))
                .await;
            debug!(
                conversation_id = %conversation_id,
                round,
                input_tokens = output.input_tokens,
                output_tokens = output.output_tokens,
                "LLM call complete"
            );

            match output.step {
                ModelStep::Reply(text) => {
                    notices.push(text.clone());
                    if ended {
                        drop(history);
                        self.end_conversation(conversation_id).await;
                    } else {
                        turn.push(ChatMessage::assistant(text));
                        *history = turn;
                    }
                    return Ok(notices.join("\n"));
                }
                ModelStep::ToolCalls {
                    tool_calls,
                    content,
                } => {
                    info!(
                        conversation_id = %conversation_id,
                        tools = ?tool_calls.iter().map(|tc| tc.name.as_str()).collect::<Vec<_>>(),
                        "Model requested tools"
                    );
                    turn.push(ChatMessage::assistant_with_tool_calls(
                        content,
                        tool_calls.clone(),
                    ));
                    for tc in &tool_calls {
                        let outcome = self.execute(conversation_id, tc).await?;
                        notices.extend(outcome.notice);
                        ended |= outcome.ends_conversation;
                        turn.push(ChatMessage::tool_result(&tc.id, &tc.name, outcome.content));
                    }
                }
            }
        }

        Err(LlmError::ToolLoopExhausted {
            rounds: self.max_tool_rounds,
        }
        .into())
    }

    async fn end_conversation(&self, conversation_id: &str) {
        if self.histories.lock().await.remove(conversation_id).is_some() {
            debug!(conversation_id = %conversation_id, "Conversation history dropped");
        }
    }
}
