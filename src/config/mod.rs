//! Configuration merge system
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in defaults
//! 2. User config (~/.config/runlog/config.toml or --config)
//! 3. Environment (RUNLOG_*)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{
    default_user_config_path, env_overrides, process_env_overrides, ConfigError, ConfigOrigin,
    ConfigSource, EffectiveConfig, ENV_VARS,
};
pub use merge::{deep_merge, merge_layers, nest};
