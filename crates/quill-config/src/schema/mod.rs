//! Configuration schema types for Quill.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod assistant;
mod connection;
mod system;

pub use assistant::*;
pub use connection::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Quill.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct QuillConfig {
    pub assistant: AssistantConfig,
    pub connection: ConnectionConfig,
    pub logging: LoggingConfig,
}
