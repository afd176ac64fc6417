use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Launcher used when nothing else is configured
pub const DEFAULT_LAUNCH_PROGRAM: &str = "java";

/// Default child process timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// `[defaults]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Defaults {
    pub verbose: Option<bool>,
}

/// `[launch]` section: how the compiled scratch program is started
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LaunchConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before `-cp`
    #[serde(default)]
    pub jvm_args: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    DEFAULT_LAUNCH_PROGRAM.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            jvm_args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LaunchConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[classpath]` section: runtime context of the scratch module
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClasspathConfig {
    /// Compiled output directories of the associated module
    #[serde(default)]
    pub module_output: Vec<Utf8PathBuf>,
    /// Transitive dependency jars and directories
    #[serde(default)]
    pub dependencies: Vec<Utf8PathBuf>,
}

/// An external program backing one toolchain collaborator.
///
/// `{input}`, `{unit}`, `{out_dir}` and `{classpath}` in `args` are
/// substituted per call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// `[toolchain]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolchainConfig {
    pub instrumenter: Option<ToolCommand>,
    pub analyzer: Option<ToolCommand>,
    pub compiler: Option<ToolCommand>,
}

impl ToolchainConfig {
    /// Names of the collaborators with no command configured.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.instrumenter.is_none() {
            missing.push("instrumenter");
        }
        if self.analyzer.is_none() {
            missing.push("analyzer");
        }
        if self.compiler.is_none() {
            missing.push("compiler");
        }
        missing
    }
}

/// Overrides collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<std::path::PathBuf>,
    pub verbose: Option<bool>,
    pub launch_program: Option<String>,
    pub timeout_secs: Option<u64>,
}
