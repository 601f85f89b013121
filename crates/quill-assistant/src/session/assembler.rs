//! Folds answer fragments into the pending answer turn.

use tracing::{debug, warn};

use quill_common::TurnStatus;

use crate::turn::{Fragment, FragmentPayload};

use super::transcript::Transcript;

/// What `ingest` did with a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Text appended; the turn is streaming.
    Appended { index: usize },
    /// End of stream; the turn is complete.
    Completed { index: usize },
    /// Error fragment; the turn failed.
    Failed { index: usize },
    /// Unknown or stale correlation id, or the conversation is closed.
    Dropped,
}

impl IngestOutcome {
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Appended { index } | Self::Completed { index } | Self::Failed { index } => {
                Some(index)
            }
            Self::Dropped => None,
        }
    }
}

impl Transcript {
    /// Apply one fragment to the answer turn its correlation id points at.
    ///
    /// Fragments for ids that are not pending are dropped; they never touch
    /// another turn and never create one.
    pub(crate) fn ingest(&mut self, fragment: Fragment) -> IngestOutcome {
        let Fragment {
            correlation_id,
            payload,
        } = fragment;

        if self.closed {
            debug!(correlation_id = %correlation_id, "dropping fragment after close");
            return IngestOutcome::Dropped;
        }

        let Some(&index) = self.pending.get(&correlation_id) else {
            warn!(
                correlation_id = %correlation_id,
                "routing anomaly: fragment for unknown or finished exchange dropped"
            );
            return IngestOutcome::Dropped;
        };

        let Some(turn) = self.turns.get_mut(index).filter(|t| t.status.is_in_flight()) else {
            warn!(
                correlation_id = %correlation_id,
                index,
                "routing anomaly: pending id points at a finished turn"
            );
            self.pending.remove(&correlation_id);
            return IngestOutcome::Dropped;
        };

        match payload {
            FragmentPayload::Text(text) => {
                turn.text.push_str(&text);
                turn.status = TurnStatus::Streaming;
                IngestOutcome::Appended { index }
            }
            FragmentPayload::End => {
                turn.status = TurnStatus::Complete;
                self.pending.remove(&correlation_id);
                debug!(correlation_id = %correlation_id, chars = turn.text.len(), "answer complete");
                IngestOutcome::Completed { index }
            }
            FragmentPayload::Error(message) => {
                warn!(correlation_id = %correlation_id, error = %message, "answer failed");
                turn.status = TurnStatus::Failed;
                turn.error = Some(self.failure_message.clone());
                self.pending.remove(&correlation_id);
                IngestOutcome::Failed { index }
            }
        }
    }
}
