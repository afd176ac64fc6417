use std::collections::BTreeMap;

use scratchrun_utils::types::ConfigSource;

use super::{Config, ToolCommand};

fn source_label(source: Option<&ConfigSource>) -> &'static str {
    match source {
        Some(ConfigSource::Cli) => "cli",
        Some(ConfigSource::Config) => "config",
        Some(ConfigSource::Programmatic) => "programmatic",
        Some(ConfigSource::Default) | None => "default",
    }
}

fn render_command(command: &ToolCommand) -> String {
    if command.args.is_empty() {
        command.program.clone()
    } else {
        format!("{} {}", command.program, command.args.join(" "))
    }
}

impl Config {
    /// Effective settings as `key -> (value, source)`, ordered by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();
        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key)).to_string();
            config.insert(key.to_string(), (value, source));
        };

        add("verbose", self.verbose().to_string());
        add("launch_program", self.launch.program.clone());
        add("jvm_args", self.launch.jvm_args.join(" "));
        add("timeout_secs", self.launch.timeout_secs.to_string());

        let classpath: Vec<&str> = self
            .classpath
            .module_output
            .iter()
            .chain(&self.classpath.dependencies)
            .map(|p| p.as_str())
            .collect();
        add("classpath", classpath.join(", "));

        for (key, command) in [
            ("toolchain.instrumenter", &self.toolchain.instrumenter),
            ("toolchain.analyzer", &self.toolchain.analyzer),
            ("toolchain.compiler", &self.toolchain.compiler),
        ] {
            let value = command
                .as_ref()
                .map_or_else(|| "(not configured)".to_string(), render_command);
            add(key, value);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, ToolCommand};

    #[test]
    fn test_effective_config_labels_sources() {
        let config = Config::builder()
            .timeout_secs(20)
            .analyzer(ToolCommand {
                program: "kt-analyze".to_string(),
                args: vec!["{input}".to_string()],
            })
            .build()
            .unwrap();

        let effective = config.effective_config();
        assert_eq!(
            effective.get("timeout_secs"),
            Some(&("20".to_string(), "programmatic".to_string()))
        );
        assert_eq!(
            effective.get("launch_program"),
            Some(&("java".to_string(), "default".to_string()))
        );
        assert_eq!(
            effective.get("toolchain.analyzer").map(|(v, _)| v.as_str()),
            Some("kt-analyze {input}")
        );
        assert_eq!(
            effective.get("toolchain.compiler").map(|(v, s)| (v.as_str(), s.as_str())),
            Some(("(not configured)", "default"))
        );
    }
}
