//! Incremental rendering of answer turns to the terminal.

use quill_common::{CorrelationId, TurnStatus};

/// Tracks how much of the current answer is already on screen, so each
/// update prints only the new suffix.
#[derive(Debug, Default)]
pub struct AnswerPrinter {
    answer: Option<CorrelationId>,
    printed: usize,
    finished: bool,
}

impl AnswerPrinter {
    /// Text to write for the latest snapshot of the answer `answer`.
    ///
    /// Keyed by correlation id, since turn indices restart after the
    /// history is cleared.
    pub fn delta(
        &mut self,
        answer: &CorrelationId,
        text: &str,
        status: TurnStatus,
        error: Option<&str>,
    ) -> String {
        if self.answer.as_ref() != Some(answer) {
            self.answer = Some(answer.clone());
            self.printed = 0;
            self.finished = false;
        }
        if self.finished {
            return String::new();
        }

        let mut out = String::new();
        if let Some(new) = text.get(self.printed..) {
            out.push_str(new);
            self.printed = text.len();
        }

        match status {
            TurnStatus::Complete => {
                out.push('\n');
                self.finished = true;
            }
            TurnStatus::Failed => {
                if !text.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("[{}]\n", error.unwrap_or("failed")));
                self.finished = true;
            }
            TurnStatus::Pending | TurnStatus::Streaming => {}
        }
        out
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_only_new_text() {
        let id = CorrelationId::from("a");
        let mut printer = AnswerPrinter::default();
        assert_eq!(printer.delta(&id, "X is ", TurnStatus::Streaming, None), "X is ");
        assert_eq!(
            printer.delta(&id, "X is a thing.", TurnStatus::Streaming, None),
            "a thing."
        );
        assert_eq!(printer.delta(&id, "X is a thing.", TurnStatus::Complete, None), "\n");
        assert_eq!(printer.delta(&id, "X is a thing.", TurnStatus::Complete, None), "");
    }

    #[test]
    fn failed_answer_shows_message_after_partial_text() {
        let id = CorrelationId::from("a");
        let mut printer = AnswerPrinter::default();
        printer.delta(&id, "Half", TurnStatus::Streaming, None);
        assert_eq!(
            printer.delta(&id, "Half", TurnStatus::Failed, Some("Sorry")),
            "\n[Sorry]\n"
        );
    }

    #[test]
    fn next_answer_starts_from_scratch() {
        let mut printer = AnswerPrinter::default();
        printer.delta(&CorrelationId::from("a"), "first", TurnStatus::Complete, None);
        assert_eq!(
            printer.delta(&CorrelationId::from("b"), "second", TurnStatus::Streaming, None),
            "second"
        );
    }

    #[test]
    fn answer_after_cleared_history_is_printed() {
        // Both answers sit at index 1: the history was cleared in between.
        let mut printer = AnswerPrinter::default();
        printer.delta(&CorrelationId::from("a"), "first", TurnStatus::Complete, None);
        assert_eq!(
            printer.delta(&CorrelationId::from("b"), "second", TurnStatus::Streaming, None),
            "second"
        );
        assert_eq!(
            printer.delta(&CorrelationId::from("b"), "second!", TurnStatus::Complete, None),
            "!\n"
        );
    }

    #[test]
    fn reset_forgets_the_finished_answer() {
        let id = CorrelationId::from("a");
        let mut printer = AnswerPrinter::default();
        printer.delta(&id, "done", TurnStatus::Complete, None);
        printer.reset();
        assert_eq!(printer.delta(&id, "done", TurnStatus::Complete, None), "done\n");
    }
}
