//! Knowledge-base (QNA) lookup port.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

/// Errors from the knowledge-base service.
#[derive(Debug, thiserror::Error)]
pub enum QnaError {
    #[error("knowledge base request failed: {0}")]
    Request(String),

    #[error("unexpected knowledge base payload: {0}")]
    Payload(String),
}

/// Answer source tag for messages that end the conversation.
const GOODBYE_SOURCE: &str = "GOODBYES";

/// One ranked answer.
#[derive(Debug, Clone, Deserialize)]
pub struct QnaAnswer {
    pub id: Uuid,
    pub text: String,
    /// Confidence score; zero means "no usable answer".
    pub accuracy: f32,
    #[serde(default)]
    pub answer_source: String,
}

impl QnaAnswer {
    /// Whether accepting this answer should close the treatment.
    pub fn closes_treatment(&self) -> bool {
        self.answer_source == GOODBYE_SOURCE
    }
}

/// A ranked answer set for one question.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QnaReply {
    pub request_id: Uuid,
    #[serde(default)]
    pub answers: Vec<QnaAnswer>,
}

impl QnaReply {
    /// First answer with a positive confidence score, if any.
    pub fn best(&self) -> Option<&QnaAnswer> {
        self.answers.iter().find(|answer| answer.accuracy > 0.0)
    }
}

/// Port for the knowledge-base lookup service.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Look up ranked answers for the user's last message.
    async fn query(
        &self,
        user: Uuid,
        skip_greetings: bool,
        skip_goodbyes: bool,
    ) -> Result<QnaReply, QnaError>;

    /// Acknowledge which answer was served. Callers fire this detached;
    /// failures are logged, never surfaced to the user.
    async fn mark_selected(&self, request: Uuid, result: Uuid) -> Result<(), QnaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(accuracy: f32, source: &str) -> QnaAnswer {
        QnaAnswer {
            id: Uuid::new_v4(),
            text: "answer".to_string(),
            accuracy,
            answer_source: source.to_string(),
        }
    }

    #[test]
    fn best_skips_zero_accuracy() {
        let reply = QnaReply {
            request_id: Uuid::new_v4(),
            answers: vec![answer(0.0, "FAQ"), answer(0.7, "FAQ")],
        };
        assert_eq!(reply.best().unwrap().accuracy, 0.7);
    }

    #[test]
    fn best_none_when_all_zero() {
        let reply = QnaReply {
            request_id: Uuid::new_v4(),
            answers: vec![answer(0.0, "FAQ")],
        };
        assert!(reply.best().is_none());
    }

    #[test]
    fn goodbye_answers_close_treatment() {
        assert!(answer(0.9, "GOODBYES").closes_treatment());
        assert!(!answer(0.9, "FAQ").closes_treatment());
    }
}
