use clap::Args;
use malt_common::config::Config;
use malt_common::error::Result;

use crate::cli::GraphContext;

#[derive(Args, Debug)]
pub struct Leaves {
    /// Only leaves that are actually installed
    #[arg(long)]
    pub installed: bool,
}

impl Leaves {
    pub fn run(&self, config: &Config) -> Result<()> {
        let ctx = GraphContext::load(config)?;
        ctx.print_diagnostics();

        let mut leaves: Vec<&str> = ctx.report.graph.leaves();
        if self.installed {
            leaves.retain(|name| ctx.registry.is_installed(name));
        }
        leaves.sort_unstable();
        for name in leaves {
            println!("{name}");
        }
        Ok(())
    }
}
