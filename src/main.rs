mod cli;

use log::info;
use sinklog::config::LoggerConfiguration;
use sinklog::error::{self, Result};
use std::path::Path;

/// 初始化命令行自身的控制台日志
fn init_simple_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn main() -> Result<()> {
    use clap::Parser;
    let cli = cli::opts::Cli::parse();

    match &cli.command {
        Some(cli::opts::Commands::Init { output, force }) => {
            init_simple_logging(cli.verbose, cli.quiet);
            cli::init::handle_init(output, *force)
        }
        Some(cli::opts::Commands::Completions { shell }) => {
            cli::opts::Cli::generate_completions(*shell);
            Ok(())
        }
        Some(cli::opts::Commands::Validate { config }) => {
            init_simple_logging(cli.verbose, cli.quiet);
            let cfg = load_config(config)?;
            info!("Validating configuration");
            cli::validate::handle_validate(&cfg)
        }
        Some(cli::opts::Commands::Emit {
            config,
            level,
            grace,
            message,
        }) => {
            init_simple_logging(cli.verbose, cli.quiet);
            let cfg = load_config(config)?;
            cli::emit::handle_emit(&cfg, level, message, *grace)
        }
        None => {
            print_help();
            std::process::exit(1);
        }
    }
}

fn load_config(config_path: &str) -> Result<LoggerConfiguration> {
    let path = Path::new(config_path);
    match LoggerConfiguration::from_file(path) {
        Ok(c) => {
            eprintln!("Loaded configuration file: {config_path}");
            Ok(c)
        }
        Err(e) => {
            if let error::Error::Config(error::ConfigError::NotFound(_)) = &e {
                eprintln!("Configuration file not found: {config_path}, using console sink only");
                eprintln!("Tip: run 'sinklog init' to generate a configuration file");
                LoggerConfiguration::resolve(&serde_json::json!(["console"]))
            } else {
                Err(e)
            }
        }
    }
}

fn print_help() {
    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("sinklog - Multi-sink logging toolkit");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("\nUsage: sinklog <COMMAND> [OPTIONS]");
    eprintln!("\nCommands:");
    eprintln!("  init          Generate a default configuration file");
    eprintln!("  validate      Validate a configuration file and activate its sinks");
    eprintln!("  emit          Emit a single record through the configured sinks");
    eprintln!("  completions   Generate shell completion scripts");
    eprintln!("\nOptions:");
    eprintln!("  -v, --verbose   Enable verbose output (debug level)");
    eprintln!("  -q, --quiet     Suppress non-error output");
    eprintln!("  -h, --help      Print help information");
    eprintln!("  -V, --version   Print version information");
    eprintln!("\nExamples:");
    eprintln!("  # Initialize configuration");
    eprintln!("  sinklog init");
    eprintln!("\n  # Validate configuration");
    eprintln!("  sinklog validate -c sinklog.toml");
    eprintln!("\n  # Send a test alert");
    eprintln!("  sinklog emit -l ERROR \"disk almost full\"");
    eprintln!("\nFor more help: sinklog --help");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}
