//! Conversation session: turn history, fragment assembly, exchange
//! serialization.

mod assembler;
mod manager;
mod transcript;

#[cfg(test)]
mod tests;

pub use assembler::IngestOutcome;
pub use manager::ConversationSession;
