use std::collections::HashMap;
use std::time::Duration;

use camino::Utf8PathBuf;
use scratchrun_utils::error::ScratchError;
use scratchrun_utils::types::ConfigSource;

use super::{ClasspathConfig, Config, Defaults, LaunchConfig, ToolCommand, ToolchainConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Builders never read files or the environment, which makes them the
    /// preferred entry point for embedding and tests.
    ///
    /// ```rust
    /// use scratchrun_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .launch_program("java")
    ///     .timeout(Duration::from_secs(30))
    ///     .dependency("lib/kotlin-stdlib.jar")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.launch.timeout_secs, 30);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent construction of a [`Config`].
///
/// Every value set here is attributed to [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    verbose: Option<bool>,
    launch_program: Option<String>,
    jvm_args: Vec<String>,
    timeout_secs: Option<u64>,
    module_output: Vec<Utf8PathBuf>,
    dependencies: Vec<Utf8PathBuf>,
    instrumenter: Option<ToolCommand>,
    analyzer: Option<ToolCommand>,
    compiler: Option<ToolCommand>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    #[must_use]
    pub fn launch_program(mut self, program: impl Into<String>) -> Self {
        self.launch_program = Some(program.into());
        self
    }

    #[must_use]
    pub fn jvm_arg(mut self, arg: impl Into<String>) -> Self {
        self.jvm_args.push(arg.into());
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sub-second precision is truncated.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        self.timeout_secs(timeout.as_secs())
    }

    #[must_use]
    pub fn module_output(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.module_output.push(path.into());
        self
    }

    #[must_use]
    pub fn dependency(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.dependencies.push(path.into());
        self
    }

    #[must_use]
    pub fn instrumenter(mut self, command: ToolCommand) -> Self {
        self.instrumenter = Some(command);
        self
    }

    #[must_use]
    pub fn analyzer(mut self, command: ToolCommand) -> Self {
        self.analyzer = Some(command);
        self
    }

    #[must_use]
    pub fn compiler(mut self, command: ToolCommand) -> Self {
        self.compiler = Some(command);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ScratchError> {
        let mut source_attribution = HashMap::new();
        let mut mark = |key: &str, set: bool| {
            let source = if set {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Default
            };
            source_attribution.insert(key.to_string(), source);
        };

        mark("verbose", self.verbose.is_some());
        mark("launch_program", self.launch_program.is_some());
        mark("jvm_args", !self.jvm_args.is_empty());
        mark("timeout_secs", self.timeout_secs.is_some());
        mark(
            "classpath",
            !self.module_output.is_empty() || !self.dependencies.is_empty(),
        );
        if self.instrumenter.is_some() {
            mark("toolchain.instrumenter", true);
        }
        if self.analyzer.is_some() {
            mark("toolchain.analyzer", true);
        }
        if self.compiler.is_some() {
            mark("toolchain.compiler", true);
        }

        let mut launch = LaunchConfig::default();
        if let Some(program) = self.launch_program {
            launch.program = program;
        }
        launch.jvm_args = self.jvm_args;
        if let Some(timeout_secs) = self.timeout_secs {
            launch.timeout_secs = timeout_secs;
        }

        let config = Config {
            defaults: Defaults {
                verbose: self.verbose,
            },
            launch,
            classpath: ClasspathConfig {
                module_output: self.module_output,
                dependencies: self.dependencies,
            },
            toolchain: ToolchainConfig {
                instrumenter: self.instrumenter,
                analyzer: self.analyzer,
                compiler: self.compiler,
            },
            source_attribution,
            config_path: None,
        };

        config.validate()?;
        Ok(config)
    }
}
