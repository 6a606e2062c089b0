//! Submission types for the conversation loop.

/// Parses user input into Submission types.
pub struct SubmissionParser;

impl SubmissionParser {
    /// Parse message content into a Submission.
    pub fn parse(content: &str) -> Submission {
        let trimmed = content.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Submission::Quit;
        }
        Submission::user_input(trimmed)
    }
}

/// A submission to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// User text input.
    UserInput {
        /// The user's message content.
        content: String,
    },

    /// End the conversation.
    Quit,
}

impl Submission {
    /// Create a user input submission.
    pub fn user_input(content: impl Into<String>) -> Self {
        Self::UserInput {
            content: content.into(),
        }
    }
}
