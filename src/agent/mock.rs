//! Offline responder: answers with the tone composer, no network.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use rand::Rng;
use tokio::sync::Mutex;

use crate::agent::driver::Responder;
use crate::coach::{ToneComposer, ToneContext};
use crate::error::Error;
use crate::state::StateStore;

pub const GREETING: &str = "안녕하세요! 저는 목표 설정 코치 Goaler예요. 어떤 목표를 함께 세워볼까요?";

pub struct MockDriver<R> {
    store: Arc<dyn StateStore>,
    composer: Mutex<ToneComposer<R>>,
    greeted: Mutex<HashSet<String>>,
}

impl<R: Rng + Send> MockDriver<R> {
    pub fn new(store: Arc<dyn StateStore>, composer: ToneComposer<R>) -> Self {
        Self {
            store,
            composer: Mutex::new(composer),
            greeted: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl<R: Rng + Send> Responder for MockDriver<R> {
    async fn respond(&self, conversation_id: &str, content: &str) -> Result<String, Error> {
        tracing::debug!(conversation_id = %conversation_id, chars = content.len(), "Mock turn");

        let ctx = match self.store.read(conversation_id).await {
            Some(snapshot) => ToneContext::from_snapshot(&snapshot),
            None => ToneContext::default(),
        };
        let message = self.composer.lock().await.compose(&ctx, &Local::now());

        let first_turn = self.greeted.lock().await.insert(conversation_id.to_string());
        if first_turn {
            Ok(format!("{GREETING} {message}"))
        } else {
            Ok(message)
        }
    }

    async fn end_conversation(&self, conversation_id: &str) {
        self.greeted.lock().await.remove(conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{EnergyStatus, UserPreference};
    use crate::state::{ConversationSnapshot, InMemoryStateStore};
    use rand::rngs::mock::StepRng;
    use uuid::Uuid;

    fn driver(store: Arc<InMemoryStateStore>) -> MockDriver<StepRng> {
        MockDriver::new(store, ToneComposer::new(StepRng::new(0, 0)))
    }

    #[tokio::test]
    async fn greets_once_per_conversation() {
        let driver = driver(Arc::new(InMemoryStateStore::new()));
        let first = driver.respond("conv_1", "안녕").await.unwrap();
        assert!(first.starts_with("안녕하세요"));
        assert!(first.contains("좋아요!"));

        let second = driver.respond("conv_1", "뭐 하지?").await.unwrap();
        assert!(!second.contains("안녕하세요"));

        let other = driver.respond("conv_2", "안녕").await.unwrap();
        assert!(other.starts_with("안녕하세요"));
    }

    #[tokio::test]
    async fn ended_conversation_is_greeted_again() {
        let driver = driver(Arc::new(InMemoryStateStore::new()));
        driver.respond("conv_1", "안녕").await.unwrap();
        driver.end_conversation("conv_1").await;
        assert!(driver.greeted.lock().await.is_empty());

        let again = driver.respond("conv_1", "또 왔어요").await.unwrap();
        assert!(again.starts_with("안녕하세요"));
    }

    #[tokio::test]
    async fn tone_follows_conversation_state() {
        let store = Arc::new(InMemoryStateStore::new());
        let mut snapshot = ConversationSnapshot::new(
            "conv_1",
            Uuid::new_v4(),
            "마라톤",
            UserPreference::defaults_for("u1"),
        );
        snapshot.last_energy = Some(EnergyStatus::NeedsPotion);
        store.start("conv_1", snapshot).await.unwrap();

        let reply = driver(store).respond("conv_1", "힘들어요").await.unwrap();
        assert!(reply.contains("잠깐 숨 고를게요."));
        assert!(reply.contains("회복 루틴"));
    }
}
