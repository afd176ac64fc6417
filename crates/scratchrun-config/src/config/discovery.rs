use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use scratchrun_utils::error::ConfigError;
use scratchrun_utils::types::ConfigSource;

use super::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CliArgs, ClasspathConfig, Config, Defaults, LaunchConfig,
    ToolchainConfig,
};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    launch: Option<PartialLaunch>,
    classpath: Option<ClasspathConfig>,
    toolchain: Option<ToolchainConfig>,
}

/// `[launch]` as written in the file; absent keys keep lower-precedence values.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialLaunch {
    program: Option<String>,
    jvm_args: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// Path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut source_attribution = HashMap::new();

        let mut defaults = Defaults::default();
        let mut launch = LaunchConfig::default();
        let mut classpath = ClasspathConfig::default();
        let mut toolchain = ToolchainConfig::default();

        for key in ["verbose", "launch_program", "jvm_args", "timeout_secs", "classpath"] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = if let Some(explicit_path) = &cli_args.config_path {
            if !explicit_path.exists() {
                return Err(ConfigError::NotFound {
                    path: explicit_path.display().to_string(),
                }
                .into());
            }
            Some(explicit_path.clone())
        } else {
            Self::discover_config_file_from(start_dir)?
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Loaded configuration file");

            if let Some(file_defaults) = file_config.defaults {
                if file_defaults.verbose.is_some() {
                    defaults.verbose = file_defaults.verbose;
                    source_attribution.insert("verbose".to_string(), ConfigSource::Config);
                }
            }

            if let Some(file_launch) = file_config.launch {
                if let Some(program) = file_launch.program {
                    launch.program = program;
                    source_attribution.insert("launch_program".to_string(), ConfigSource::Config);
                }
                if let Some(jvm_args) = file_launch.jvm_args {
                    launch.jvm_args = jvm_args;
                    source_attribution.insert("jvm_args".to_string(), ConfigSource::Config);
                }
                if let Some(timeout_secs) = file_launch.timeout_secs {
                    launch.timeout_secs = timeout_secs;
                    source_attribution.insert("timeout_secs".to_string(), ConfigSource::Config);
                }
            }

            if let Some(file_classpath) = file_config.classpath {
                classpath = file_classpath;
                source_attribution.insert("classpath".to_string(), ConfigSource::Config);
            }

            if let Some(file_toolchain) = file_config.toolchain {
                for (key, present) in [
                    ("toolchain.instrumenter", file_toolchain.instrumenter.is_some()),
                    ("toolchain.analyzer", file_toolchain.analyzer.is_some()),
                    ("toolchain.compiler", file_toolchain.compiler.is_some()),
                ] {
                    if present {
                        source_attribution.insert(key.to_string(), ConfigSource::Config);
                    }
                }
                toolchain = file_toolchain;
            }
        }

        if let Some(verbose) = cli_args.verbose {
            // A bare `false` from the CLI means "flag not given".
            if verbose {
                defaults.verbose = Some(true);
                source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
            }
        }
        if let Some(program) = &cli_args.launch_program {
            launch.program = program.clone();
            source_attribution.insert("launch_program".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout_secs) = cli_args.timeout_secs {
            launch.timeout_secs = timeout_secs;
            source_attribution.insert("timeout_secs".to_string(), ConfigSource::Cli);
        }

        let config = Config {
            defaults,
            launch,
            classpath,
            toolchain,
            source_attribution,
            config_path,
        };

        config.validate()?;
        Ok(config)
    }

    /// Search upward for `.scratchrun/config.toml`, stopping at a repository root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: TomlConfig = toml::from_str(&content).map_err(|e| {
                    ConfigError::InvalidFile(format!("{}: {e}", path.display()))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        }
    }
}
