//! Full configuration validation.
//!
//! Each section has its own validator; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod assistant;
mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::QuillConfig;
use quill_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &QuillConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    assistant::validate_assistant(&mut errors, config);
    assistant::validate_connection(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
