//! Lifecycle of the persistent assistant channel.
//!
//! A single background task owns the physical connection and walks the
//! state machine `Disconnected → Connecting → Open → Reconnecting →
//! Connecting → …` with exponential backoff between attempts. An explicit
//! close cancels the task and its backoff timer and leaves the manager in
//! `Disconnected` for good.

mod connection;
mod connector;
mod manager;


pub use connector::{Connector, FrameSink, FrameStream, WsConnector};
pub use manager::ConnectionManager;
