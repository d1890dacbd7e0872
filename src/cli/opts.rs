use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};

/// Multi-sink logging toolkit
#[derive(Debug, Parser)]
#[command(
    name = "sinklog",
    version,
    about = "Fan log records out to console/file/SQLite/MariaDB/Discord/Slack sinks",
    long_about = "Generate, validate and exercise sinklog configurations. Each configured sink receives every record at or above its alert level."
)]
pub struct Cli {
    /// Enable verbose output (debug level)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Suppress non-error output (error level only)
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a default configuration file
    Init {
        /// Output configuration file path
        #[arg(short = 'o', long = "output", default_value = "sinklog.toml")]
        output: String,
        /// Force overwrite if file exists
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
    /// Validate a configuration file and activate its sinks
    Validate {
        /// Configuration file path
        #[arg(short = 'c', long = "config", default_value = "sinklog.toml")]
        config: String,
    },
    /// Emit a single record through the configured sinks
    Emit {
        /// Configuration file path
        #[arg(short = 'c', long = "config", default_value = "sinklog.toml")]
        config: String,
        /// Record level: DEBUG, INFO, WARNING, ERROR, CRITICAL
        #[arg(short = 'l', long = "level", default_value = "INFO")]
        level: String,
        /// Seconds to wait for webhook deliveries before exiting
        #[arg(long = "grace", default_value_t = 10)]
        grace: u64,
        /// Message text
        message: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Generate shell completions
    pub fn generate_completions(shell: Shell) {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
    }
}
