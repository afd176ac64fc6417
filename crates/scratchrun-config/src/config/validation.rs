use std::path::PathBuf;

use scratchrun_utils::error::{ConfigError, ScratchError};

use super::{Config, ToolCommand};

const MAX_TIMEOUT_SECS: u64 = 3600;

fn invalid(key: &str, value: impl Into<String>) -> ScratchError {
    ScratchError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    })
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ScratchError> {
        if self.launch.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be greater than 0"));
        }
        if self.launch.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(invalid(
                "timeout_secs",
                format!("exceeds maximum limit of {MAX_TIMEOUT_SECS} seconds"),
            ));
        }

        if self.launch.program.trim().is_empty() {
            return Err(invalid("launch_program", "must not be empty"));
        }

        for (key, command) in [
            ("toolchain.instrumenter", &self.toolchain.instrumenter),
            ("toolchain.analyzer", &self.toolchain.analyzer),
            ("toolchain.compiler", &self.toolchain.compiler),
        ] {
            if let Some(ToolCommand { program, .. }) = command
                && program.trim().is_empty()
            {
                return Err(invalid(key, "program must not be empty"));
            }
        }

        Ok(())
    }

    /// Resolve the launcher to an executable path.
    ///
    /// Absolute or relative paths are accepted as-is when they exist; bare
    /// names are looked up on `PATH`.
    pub fn validate_launcher(&self) -> Result<PathBuf, ConfigError> {
        let program = &self.launch.program;
        let candidate = PathBuf::from(program);
        if candidate.components().count() > 1 {
            if candidate.exists() {
                return Ok(candidate);
            }
            return Err(ConfigError::LauncherNotFound {
                program: program.clone(),
            });
        }

        which::which(program).map_err(|_| ConfigError::LauncherNotFound {
            program: program.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;

    #[test]
    fn test_timeout_bounds() {
        assert!(ConfigBuilder::new().timeout_secs(1).build().is_ok());
        assert!(ConfigBuilder::new().timeout_secs(3600).build().is_ok());
        assert!(ConfigBuilder::new().timeout_secs(3601).build().is_err());
    }

    #[test]
    fn test_empty_launcher_rejected() {
        let err = ConfigBuilder::new().launch_program("  ").build().unwrap_err();
        assert!(err.to_string().contains("launch_program"));
    }

    #[test]
    fn test_empty_tool_program_rejected() {
        let err = ConfigBuilder::new()
            .analyzer(ToolCommand {
                program: String::new(),
                args: Vec::new(),
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("toolchain.analyzer"));
    }

    #[test]
    fn test_missing_launcher_reported() {
        let config = ConfigBuilder::new()
            .launch_program("scratchrun-no-such-launcher-xyz")
            .build()
            .unwrap();
        assert!(matches!(
            config.validate_launcher(),
            Err(ConfigError::LauncherNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_launcher_path_reported() {
        let config = ConfigBuilder::new()
            .launch_program("/definitely/not/here/java")
            .build()
            .unwrap();
        assert!(config.validate_launcher().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_launcher_found_on_path() {
        let config = ConfigBuilder::new().launch_program("sh").build().unwrap();
        assert!(config.validate_launcher().is_ok());
    }
}
