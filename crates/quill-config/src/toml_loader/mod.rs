//! TOML config file loading and creation.

mod loader;
mod template;


pub use loader::{config_path, load_default, read_config, seed_config, CONFIG_ENV};
