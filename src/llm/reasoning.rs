//! One model step: the conversation so far in, a reply or tool calls out.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::{ChatMessage, LlmProvider, ToolCall, ToolCompletionRequest, ToolDefinition};

/// What the model wants to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStep {
    /// Final text for the user; the turn is over.
    Reply(String),
    /// Run these tools and report back.
    ToolCalls {
        tool_calls: Vec<ToolCall>,
        content: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub step: ModelStep,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A provider bound to the coach's system prompt and tool catalogue.
pub struct Reasoning {
    llm: Arc<dyn LlmProvider>,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
}

impl Reasoning {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        system_prompt: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            tools,
        }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Ask the model for the next step. The system prompt always goes first.
    pub async fn step(&self, history: &[ChatMessage]) -> Result<StepOutput, LlmError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt.as_str()));
        messages.extend_from_slice(history);

        let response = self
            .llm
            .complete_with_tools(ToolCompletionRequest::new(messages, self.tools.clone()))
            .await?;

        let step = if response.tool_calls.is_empty() {
            ModelStep::Reply(response.content.unwrap_or_default())
        } else {
            ModelStep::ToolCalls {
                tool_calls: response.tool_calls,
                content: response.content,
            }
        };
        Ok(StepOutput {
            step,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Role, ToolCompletionResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct Canned {
        response: ToolCompletionResponse,
        seen: Mutex<Vec<ToolCompletionRequest>>,
    }

    #[async_trait]
    impl LlmProvider for Canned {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete_with_tools(
            &self,
            request: ToolCompletionRequest,
        ) -> Result<ToolCompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    fn reasoning(response: ToolCompletionResponse) -> (Reasoning, Arc<Canned>) {
        let llm = Arc::new(Canned {
            response,
            seen: Mutex::new(Vec::new()),
        });
        let tools = vec![ToolDefinition {
            name: "finalize_goal".into(),
            description: "d".into(),
            parameters: json!({"type": "object"}),
        }];
        (Reasoning::new(llm.clone(), "coach", tools), llm)
    }

    #[tokio::test]
    async fn system_prompt_and_tools_are_sent() {
        let (reasoning, llm) = reasoning(ToolCompletionResponse {
            content: Some("안녕하세요".into()),
            tool_calls: vec![],
            input_tokens: 12,
            output_tokens: 3,
        });

        let out = reasoning.step(&[ChatMessage::user("안녕")]).await.unwrap();
        assert_eq!(out.step, ModelStep::Reply("안녕하세요".into()));
        assert_eq!((out.input_tokens, out.output_tokens), (12, 3));

        let seen = llm.seen.lock().unwrap();
        let messages = &seen[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content.as_deref(), Some("coach"));
        assert_eq!(seen[0].tools[0].name, "finalize_goal");
    }

    #[tokio::test]
    async fn tool_calls_win_over_content() {
        let (reasoning, _) = reasoning(ToolCompletionResponse {
            content: Some("잠시만요".into()),
            tool_calls: vec![ToolCall {
                id: "c1".into(),
                name: "finalize_goal".into(),
                arguments: json!({}),
            }],
            input_tokens: 0,
            output_tokens: 0,
        });

        let out = reasoning.step(&[]).await.unwrap();
        match out.step {
            ModelStep::ToolCalls {
                tool_calls,
                content,
            } => {
                assert_eq!(tool_calls[0].id, "c1");
                assert_eq!(content.as_deref(), Some("잠시만요"));
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }
}
