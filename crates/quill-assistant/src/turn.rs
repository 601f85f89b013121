//! Conversation turns, answer fragments, and the exchange handed to a transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_common::{CorrelationId, Role, TurnStatus};

/// One entry of the conversation history.
///
/// Owned by the session; the presentation layer only sees clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub(crate) id: Option<CorrelationId>,
    pub(crate) role: Role,
    pub(crate) text: String,
    pub(crate) status: TurnStatus,
    pub(crate) error: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Turn {
    pub(crate) fn user(text: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::User,
            text: text.into(),
            status: TurnStatus::Complete,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn pending_answer(id: CorrelationId) -> Self {
        Self {
            id: Some(id),
            role: Role::Assistant,
            text: String::new(),
            status: TurnStatus::Pending,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Correlation id of an answer turn. User turns have none.
    pub fn id(&self) -> Option<&CorrelationId> {
        self.id.as_ref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> TurnStatus {
        self.status
    }

    /// User-visible failure message, set only on `Failed` turns.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// What a fragment carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentPayload {
    Text(String),
    End,
    Error(String),
}

impl FragmentPayload {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Text(_))
    }
}

/// A piece of an answer, tagged with the exchange it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub correlation_id: CorrelationId,
    pub payload: FragmentPayload,
}

impl Fragment {
    pub fn text(correlation_id: CorrelationId, text: impl Into<String>) -> Self {
        Self {
            correlation_id,
            payload: FragmentPayload::Text(text.into()),
        }
    }

    pub fn end(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            payload: FragmentPayload::End,
        }
    }

    pub fn error(correlation_id: CorrelationId, message: impl Into<String>) -> Self {
        Self {
            correlation_id,
            payload: FragmentPayload::Error(message.into()),
        }
    }
}

/// A prior turn as sent in `previous_context`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTurn {
    pub role: Role,
    pub text: String,
}

/// One question→answer exchange handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub correlation_id: CorrelationId,
    pub question: String,
    pub history: Vec<ContextTurn>,
}
