//! Main agent loop.
//!
//! One conversation per session: read a line, hand it to the responder,
//! send the reply back, until `exit`, end of input, or Ctrl+C.

use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

use crate::agent::driver::Responder;
use crate::agent::submission::{Submission, SubmissionParser};
use crate::channels::{Channel, IncomingMessage, OutgoingResponse, StatusUpdate};
use crate::error::Error;

pub const READY_BANNER: &str =
    "--- Goaler 준비 완료. 대화를 시작하세요. (종료하려면 'exit' 입력) ---";
pub const FAREWELL: &str = "대화를 종료합니다.";
pub const APOLOGY: &str = "죄송해요, 요청을 처리하는 중에 문제가 생겼어요. 잠시 후 다시 말씀해 주세요.";

/// Fresh conversation identifier: `conv_<uuid>`.
pub fn new_conversation_id() -> String {
    format!("conv_{}", Uuid::new_v4())
}

/// The main agent that ties a channel to a responder.
pub struct Agent {
    conversation_id: String,
    responder: Arc<dyn Responder>,
    channel: Arc<dyn Channel>,
}

impl Agent {
    pub fn new(responder: Arc<dyn Responder>, channel: Arc<dyn Channel>) -> Self {
        Self {
            conversation_id: new_conversation_id(),
            responder,
            channel,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Run the agent main loop.
    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channel.start().await?;
        self.channel.announce(READY_BANNER).await?;
        tracing::info!(conversation_id = %self.conversation_id, "Goaler ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("Input closed, shutting down...");
                            break;
                        }
                    }
                }
            };

            match self.handle_message(&message).await {
                Some(response) => {
                    let _ = self
                        .channel
                        .respond(&message, OutgoingResponse::text(response))
                        .await;
                }
                None => {
                    self.channel.announce(FAREWELL).await?;
                    break;
                }
            }
        }

        self.responder.end_conversation(&self.conversation_id).await;
        self.channel.shutdown().await?;
        Ok(())
    }

    /// `None` means the user asked to leave.
    async fn handle_message(&self, message: &IncomingMessage) -> Option<String> {
        let content = match SubmissionParser::parse(&message.content) {
            Submission::Quit => return None,
            Submission::UserInput { content } => content,
        };

        tracing::debug!(
            conversation_id = %self.conversation_id,
            channel = %message.channel,
            chars = content.len(),
            "Received message"
        );
        let _ = self
            .channel
            .send_status(StatusUpdate::Thinking("Goaler가 생각 중...".into()))
            .await;

        match self.responder.respond(&self.conversation_id, &content).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::error!(conversation_id = %self.conversation_id, error = %e, "Turn failed");
                Some(APOLOGY.to_string())
            }
        }
    }
}
