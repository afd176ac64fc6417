//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// scratchrun - evaluate scratch snippets expression by expression
#[derive(Parser, Debug)]
#[command(name = "scratchrun")]
#[command(about = "Run a scratch snippet and map its output back to source lines")]
#[command(long_about = r#"
scratchrun compiles a scratch snippet with an external toolchain, runs it on the
JVM, and reports the value or output of every top-level expression against the
lines it came from.

EXAMPLES:
  # Run a snippet and print one line per expression
  scratchrun run demo.kts

  # Emit JSON lines for an editor integration
  scratchrun run demo.kts --json

  # Use a specific launcher and a shorter timeout
  scratchrun run demo.kts --java /opt/jdk/bin/java --timeout 10

  # Replay previously captured program stdout against a snippet
  scratchrun demux demo.kts captured.txt

  # Show the effective configuration and where each value came from
  scratchrun config

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .scratchrun/config.toml
  Use --config to specify an explicit config file path
  The [toolchain] section must name the instrumenter, analyzer and compiler commands

EXIT CODES:
  0  run succeeded
  1  internal error
  2  invalid arguments or configuration
  3  the run failed; the error was reported with the run's output
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile and run a scratch snippet
    Run {
        /// Snippet file to run
        file: PathBuf,

        /// Print events as JSON lines instead of text
        #[arg(long)]
        json: bool,

        /// Seconds to wait for the program before killing it
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// JVM launcher to run the compiled snippet with
        #[arg(long, value_name = "PATH")]
        java: Option<String>,
    },

    /// Decode captured program stdout against a snippet without running it
    Demux {
        /// Snippet file the output was produced from
        file: PathBuf,

        /// File holding the program's captured stdout
        captured: PathBuf,

        /// Print events as JSON lines instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Build the clap `Command` (for completions and help rendering).
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
