//! Goal operations and the conversation loop around them.

pub mod agent_loop;
pub mod driver;
pub mod goal_agent;
pub mod mock;
pub mod prompts;
pub mod submission;

pub use agent_loop::{Agent, new_conversation_id};
pub use driver::{LlmDriver, Responder};
pub use goal_agent::{GoalAgent, OnboardingContext, QuestProposal};
pub use mock::MockDriver;
pub use prompts::SYSTEM_PROMPT;
pub use submission::{Submission, SubmissionParser};
