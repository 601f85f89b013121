//! Ordered turn history plus the identity-to-pending-turn lookup.

use std::collections::HashMap;

use quill_common::{CorrelationId, TurnStatus};

use crate::turn::{ContextTurn, Exchange, Turn};
use crate::AssistantError;

/// Everything the session mutates, kept behind one lock.
pub(crate) struct Transcript {
    pub(super) turns: Vec<Turn>,
    /// Correlation id → index of its answer turn. At most one entry since
    /// exchanges are serialized.
    pub(super) pending: HashMap<CorrelationId, usize>,
    pub(super) max_context_turns: usize,
    pub(super) failure_message: String,
    pub(super) closed: bool,
}

/// Indices of the turns appended by a successful `begin_exchange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExchangeSlots {
    pub(crate) user: usize,
    pub(crate) answer: usize,
}

impl Transcript {
    pub(crate) fn new(max_context_turns: usize, failure_message: impl Into<String>) -> Self {
        Self {
            turns: Vec::new(),
            pending: HashMap::new(),
            max_context_turns,
            failure_message: failure_message.into(),
            closed: false,
        }
    }

    pub(crate) fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append the user turn and a pending answer turn, and build the
    /// exchange for the transport.
    pub(crate) fn begin_exchange(
        &mut self,
        question: &str,
    ) -> Result<(Exchange, ExchangeSlots), AssistantError> {
        if self.closed {
            return Err(AssistantError::InvalidState("conversation is closed".into()));
        }
        if self.has_pending() {
            return Err(AssistantError::InvalidState(
                "an answer is still in progress".into(),
            ));
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::InvalidState("question is empty".into()));
        }

        let history = self.context();
        let correlation_id = CorrelationId::new();

        let user = self.turns.len();
        self.turns.push(Turn::user(question));
        let answer = self.turns.len();
        self.turns.push(Turn::pending_answer(correlation_id.clone()));
        self.pending.insert(correlation_id.clone(), answer);

        Ok((
            Exchange {
                correlation_id,
                question: question.to_string(),
                history,
            },
            ExchangeSlots { user, answer },
        ))
    }

    /// Undo a `begin_exchange` whose transport refused to send.
    pub(crate) fn rollback(&mut self, correlation_id: &CorrelationId, slots: ExchangeSlots) {
        if self.pending.remove(correlation_id).is_some() && self.turns.len() == slots.answer + 1 {
            self.turns.truncate(slots.user);
        }
    }

    /// Completed turns sent as `previous_context`, most recent last.
    pub(crate) fn context(&self) -> Vec<ContextTurn> {
        let completed: Vec<&Turn> = self
            .turns
            .iter()
            .filter(|t| t.status == TurnStatus::Complete)
            .collect();
        let skip = completed.len().saturating_sub(self.max_context_turns);
        completed
            .into_iter()
            .skip(skip)
            .map(|t| ContextTurn {
                role: t.role,
                text: t.text.clone(),
            })
            .collect()
    }

    /// Mark every in-flight answer failed and stop accepting fragments.
    /// Returns the indices of the turns it failed.
    pub(crate) fn close(&mut self, reason: &str) -> Vec<usize> {
        self.closed = true;
        let mut failed: Vec<usize> = self.pending.drain().map(|(_, index)| index).collect();
        failed.sort_unstable();
        for &index in &failed {
            if let Some(turn) = self.turns.get_mut(index) {
                if turn.status.is_in_flight() {
                    turn.status = TurnStatus::Failed;
                    turn.error = Some(reason.to_string());
                }
            }
        }
        failed
    }

    /// Drop all history. Refused while an answer is in flight.
    pub(crate) fn clear(&mut self) -> Result<(), AssistantError> {
        if self.has_pending() {
            return Err(AssistantError::InvalidState(
                "cannot clear while an answer is in progress".into(),
            ));
        }
        self.turns.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_common::Role;

    fn transcript() -> Transcript {
        Transcript::new(20, "sorry")
    }

    #[test]
    fn begin_exchange_appends_user_and_pending_turns() {
        let mut t = transcript();
        let (exchange, slots) = t.begin_exchange("  What is X?  ").unwrap();

        assert_eq!(slots, ExchangeSlots { user: 0, answer: 1 });
        assert_eq!(exchange.question, "What is X?");
        assert!(exchange.history.is_empty());

        assert_eq!(t.turns[0].role, Role::User);
        assert_eq!(t.turns[0].text, "What is X?");
        assert_eq!(t.turns[0].status, TurnStatus::Complete);
        assert_eq!(t.turns[1].role, Role::Assistant);
        assert_eq!(t.turns[1].status, TurnStatus::Pending);
        assert_eq!(t.turns[1].id.as_ref(), Some(&exchange.correlation_id));
        assert!(t.has_pending());
    }

    #[test]
    fn rejects_empty_and_concurrent_questions() {
        let mut t = transcript();
        assert!(matches!(
            t.begin_exchange(" \n\t"),
            Err(AssistantError::InvalidState(_))
        ));
        assert!(t.turns.is_empty());

        t.begin_exchange("first").unwrap();
        assert!(matches!(
            t.begin_exchange("second"),
            Err(AssistantError::InvalidState(_))
        ));
        assert_eq!(t.turns.len(), 2);
    }

    #[test]
    fn rollback_removes_both_turns() {
        let mut t = transcript();
        let (exchange, slots) = t.begin_exchange("hello").unwrap();
        t.rollback(&exchange.correlation_id, slots);
        assert!(t.turns.is_empty());
        assert!(!t.has_pending());
    }

    #[test]
    fn context_skips_unfinished_turns_and_caps_length() {
        let mut t = Transcript::new(2, "sorry");
        t.turns.push(Turn::user("one"));
        t.turns.push(Turn::user("two"));
        let mut failed = Turn::pending_answer(CorrelationId::new());
        failed.status = TurnStatus::Failed;
        t.turns.push(failed);
        t.turns.push(Turn::user("three"));

        let context = t.context();
        let texts: Vec<&str> = context.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn close_fails_in_flight_answer_and_blocks_new_questions() {
        let mut t = transcript();
        t.begin_exchange("hello").unwrap();

        let failed = t.close("conversation closed");
        assert_eq!(failed, vec![1]);
        assert_eq!(t.turns[1].status, TurnStatus::Failed);
        assert_eq!(t.turns[1].error.as_deref(), Some("conversation closed"));

        assert!(t.close("again").is_empty());
        assert!(matches!(
            t.begin_exchange("more"),
            Err(AssistantError::InvalidState(_))
        ));
    }

    #[test]
    fn clear_requires_idle_transcript() {
        let mut t = transcript();
        t.begin_exchange("hello").unwrap();
        assert!(t.clear().is_err());
        t.pending.clear();
        t.clear().unwrap();
        assert!(t.turns.is_empty());
    }
}
