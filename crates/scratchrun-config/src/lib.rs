//! Configuration management for scratchrun
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. Files are TOML with `[defaults]`, `[launch]`,
//! `[classpath]` and `[toolchain]` sections.

pub mod config;

pub use config::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CliArgs, ClasspathConfig, Config, ConfigBuilder,
    DEFAULT_LAUNCH_PROGRAM, DEFAULT_TIMEOUT_SECS, Defaults, LaunchConfig, ToolCommand,
    ToolchainConfig,
};
pub use scratchrun_utils::types::ConfigSource;
