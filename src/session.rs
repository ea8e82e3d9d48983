//! The single conversation thread shared by every `/chat` request
//!
//! An async mutex is held for the whole exchange, so concurrent requests are
//! served one at a time and each one sees every previously completed
//! exchange. The turns themselves live behind a separate, briefly held lock
//! so readers never wait on an in-flight provider call.

use crate::llm::{LlmError, LlmRequest, LlmService, Role, Turn};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

pub struct ChatSession {
    llm: Arc<dyn LlmService>,
    persona: Arc<str>,
    /// Serializes exchanges; held across the provider call
    exchange: Mutex<()>,
    history: RwLock<Vec<Turn>>,
    /// Max turns sent upstream; `None` sends everything
    window: Option<usize>,
    max_tokens: Option<u32>,
}

impl ChatSession {
    pub fn new(llm: Arc<dyn LlmService>, persona: impl Into<Arc<str>>, seed: Vec<Turn>) -> Self {
        Self {
            llm,
            persona: persona.into(),
            exchange: Mutex::new(()),
            history: RwLock::new(seed),
            window: None,
            max_tokens: None,
        }
    }

    pub fn with_window(mut self, window: Option<usize>) -> Self {
        self.window = window.filter(|n| *n > 0);
        self
    }

    /// Cap on reply length requested from the provider
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens.filter(|n| *n > 0);
        self
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Send one user message and return the model's reply.
    ///
    /// Both turns are appended only when the provider answers; on error the
    /// history is left exactly as it was.
    pub async fn send_message(&self, text: &str) -> Result<String, LlmError> {
        let _exchange = self.exchange.lock().await;

        let mut messages = {
            let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
            outbound_window(&history, self.window)
        };
        messages.push(Turn::user(text));

        let request = LlmRequest {
            system: Some(self.persona.to_string()),
            messages,
            max_tokens: self.max_tokens,
        };

        let response = self.llm.complete(&request).await?;

        {
            let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
            history.push(Turn::user(text));
            history.push(Turn::model(response.text.clone()));
            tracing::debug!(turns = history.len(), "Conversation history extended");
        }

        Ok(response.text)
    }

    /// Snapshot of the full stored history
    #[allow(dead_code)] // Inspection helper for tests
    pub fn history(&self) -> Vec<Turn> {
        self.history.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Stored turn count; does not wait for an in-flight exchange
    pub fn len(&self) -> usize {
        self.history.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// The tail of `history` to send upstream.
///
/// Never starts on a model turn, since the provider expects the user to
/// open a conversation.
fn outbound_window(history: &[Turn], window: Option<usize>) -> Vec<Turn> {
    let start = window.map_or(0, |n| history.len().saturating_sub(n));
    let tail = history.get(start..).unwrap_or_default();
    let skip = if window.is_some() {
        tail.iter().take_while(|t| t.role == Role::Model).count()
    } else {
        0
    };
    tail.iter().skip(skip).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlmService;
    use crate::llm::{LlmErrorKind, LlmResponse};
    use std::time::Duration;

    fn session_with(mock: &Arc<MockLlmService>, seed: Vec<Turn>) -> ChatSession {
        ChatSession::new(mock.clone(), "You are a test persona.", seed)
    }

    #[tokio::test]
    async fn reply_is_returned_and_recorded() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_response(LlmResponse::text("hello back"));
        let session = session_with(&mock, vec![Turn::user("hi"), Turn::model("hello")]);

        let reply = session.send_message("how are you?").await.unwrap();

        assert_eq!(reply, "hello back");
        assert_eq!(
            session.history(),
            vec![
                Turn::user("hi"),
                Turn::model("hello"),
                Turn::user("how are you?"),
                Turn::model("hello back"),
            ]
        );

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("You are a test persona."));
        assert_eq!(
            requests[0].messages,
            vec![Turn::user("hi"), Turn::model("hello"), Turn::user("how are you?")]
        );
    }

    #[tokio::test]
    async fn failure_leaves_history_untouched() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_error(LlmError::server_error("boom"));
        let session = session_with(&mock, vec![Turn::user("hi"), Turn::model("hello")]);

        let err = session.send_message("again").await.unwrap_err();

        assert_eq!(err.kind, LlmErrorKind::ServerError);
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn empty_seed_still_chats() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_response(LlmResponse::text("first reply"));
        let session = session_with(&mock, Vec::new());

        assert_eq!(session.send_message("first").await.unwrap(), "first reply");
        assert_eq!(mock.recorded_requests()[0].messages, vec![Turn::user("first")]);
    }

    #[tokio::test]
    async fn concurrent_sends_are_strictly_ordered() {
        let mock = Arc::new(MockLlmService::new("mock").with_delay(Duration::from_millis(20)));
        mock.queue_response(LlmResponse::text("reply one"));
        mock.queue_response(LlmResponse::text("reply two"));
        let session = Arc::new(session_with(&mock, Vec::new()));

        let a = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("A").await })
        };
        let b = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("B").await })
        };
        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

        let history = session.history();
        assert_eq!(history.len(), 4);
        // Each user turn is immediately followed by its own reply.
        let (first, second) = if history[0].text == "A" { (&a, &b) } else { (&b, &a) };
        assert_eq!(history[1].text, *first);
        assert_eq!(history[3].text, *second);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[2].role, Role::User);

        // The second call saw the whole first exchange.
        let requests = mock.recorded_requests();
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].messages[..2], history[..2]);
    }

    #[tokio::test]
    async fn window_limits_outbound_history_only() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_response(LlmResponse::text("ok"));
        let seed = vec![
            Turn::user("u1"),
            Turn::model("m1"),
            Turn::user("u2"),
            Turn::model("m2"),
        ];
        let session = session_with(&mock, seed).with_window(Some(3));

        session.send_message("u3").await.unwrap();

        // Tail of 3 is [m1, u2, m2]; the leading model turn is dropped.
        assert_eq!(
            mock.recorded_requests()[0].messages,
            vec![Turn::user("u2"), Turn::model("m2"), Turn::user("u3")]
        );
        assert_eq!(session.len(), 6);
    }

    #[tokio::test]
    async fn turn_count_is_readable_during_an_exchange() {
        let mock = Arc::new(MockLlmService::new("mock").with_delay(Duration::from_secs(3)));
        mock.queue_response(LlmResponse::text("slow reply"));
        let session = Arc::new(session_with(&mock, vec![Turn::user("hi"), Turn::model("hello")]));

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("still there?").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(session.len(), 2);
        assert_eq!(session.history().len(), 2);
        pending.abort();
    }

    #[tokio::test]
    async fn max_tokens_is_forwarded() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_response(LlmResponse::text("ok"));
        let session = session_with(&mock, Vec::new()).with_max_tokens(Some(256));

        session.send_message("short please").await.unwrap();

        assert_eq!(mock.recorded_requests()[0].max_tokens, Some(256));
    }

    #[test]
    fn unbounded_window_keeps_everything() {
        let history = vec![Turn::model("orphan"), Turn::user("u")];
        assert_eq!(outbound_window(&history, None), history);
        assert_eq!(outbound_window(&history, Some(10)), vec![Turn::user("u")]);
    }
}
