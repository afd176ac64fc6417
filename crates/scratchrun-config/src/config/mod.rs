use std::collections::HashMap;
use std::path::PathBuf;

use scratchrun_utils::types::ConfigSource;

mod builder;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use model::{
    CliArgs, ClasspathConfig, DEFAULT_LAUNCH_PROGRAM, DEFAULT_TIMEOUT_SECS, Defaults,
    LaunchConfig, ToolCommand, ToolchainConfig,
};

/// Directory searched for while walking up from the working directory
pub const CONFIG_DIR_NAME: &str = ".scratchrun";

/// File name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Effective configuration after applying precedence
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub launch: LaunchConfig,
    pub classpath: ClasspathConfig,
    pub toolchain: ToolchainConfig,
    /// Where each effective value came from, keyed by setting name
    pub source_attribution: HashMap<String, ConfigSource>,
    /// The file that was loaded, if any
    pub config_path: Option<PathBuf>,
}

impl Config {
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }
}
