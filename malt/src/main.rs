// malt/src/main.rs
use std::process;

use clap::Parser;
use colored::Colorize;
use malt_common::config::Config;
use malt_common::error::MaltError;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::CliArgs;

// 0 success, 1 resolution/graph error, 2 missing dependencies found
const EXIT_ERROR: i32 = 1;
const EXIT_MISSING: i32 = 2;

fn main() {
    let cli_args = CliArgs::parse();

    let level_filter = match cli_args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", "Error".red().bold());
            process::exit(EXIT_ERROR);
        }
    };

    if let Err(e) = cli_args.command.run(&config) {
        match &e {
            MaltError::MissingDependency(missing) => {
                eprintln!(
                    "{}: missing {} dependencies",
                    "Error".red().bold(),
                    missing.len()
                );
                process::exit(EXIT_MISSING);
            }
            _ => {
                eprintln!("{}: {e}", "Error".red().bold());
                process::exit(EXIT_ERROR);
            }
        }
    }
}
