// malt/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use malt_common::config::Config;
use malt_common::error::Result;
use malt_common::formulary::Formulary;
use malt_common::keg::KegRegistry;
use malt_common::model::platform::PlatformDescriptor;
use malt_core::pipeline::{resolve_universe, ResolutionReport};

// Module declarations
pub mod deps;
pub mod leaves;
pub mod link;
pub mod list;
pub mod missing;
pub mod pin;
pub mod switch;
pub mod uses;

use crate::cli::deps::Deps;
use crate::cli::leaves::Leaves;
use crate::cli::link::{Link, Unlink};
use crate::cli::list::List;
use crate::cli::missing::Missing;
use crate::cli::pin::{Pin, Unpin};
use crate::cli::switch::Switch;
use crate::cli::uses::Uses;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "malt", bin_name = "malt")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Deps(Deps),
    Uses(Uses),
    Leaves(Leaves),
    Missing(Missing),
    List(List),
    Link(Link),
    Unlink(Unlink),
    Switch(Switch),
    Pin(Pin),
    Unpin(Unpin),
}

impl Command {
    pub fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Deps(command) => command.run(config),
            Self::Uses(command) => command.run(config),
            Self::Leaves(command) => command.run(config),
            Self::Missing(command) => command.run(config),
            Self::List(command) => command.run(config),
            Self::Link(command) => command.run(config),
            Self::Unlink(command) => command.run(config),
            Self::Switch(command) => command.run(config),
            Self::Pin(command) => command.run(config),
            Self::Unpin(command) => command.run(config),
        }
    }
}

/// Everything the graph-querying commands need: the installed-version
/// registry and the resolved universe for this machine.
pub struct GraphContext {
    pub registry: KegRegistry,
    pub report: ResolutionReport,
}

impl GraphContext {
    pub fn load(config: &Config) -> Result<Self> {
        let registry = KegRegistry::load(config.clone())?;
        let platform = PlatformDescriptor::detect(registry.snapshot())?;
        let formulary = Arc::new(Formulary::new(config.clone()));
        let report = resolve_universe(formulary, &platform)?;
        Ok(Self { registry, report })
    }

    /// Print collected per-formula diagnostics; the batch keeps going.
    pub fn print_diagnostics(&self) {
        for (name, err) in &self.report.errors {
            eprintln!("{} {name}: {err}", "Warning".yellow().bold());
        }
    }
}
