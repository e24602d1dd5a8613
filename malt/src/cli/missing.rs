use std::collections::BTreeSet;

use clap::Args;
use malt_common::config::Config;
use malt_common::error::{MaltError, Result};

use crate::cli::GraphContext;

#[derive(Args, Debug)]
pub struct Missing {
    /// Restrict the check to these installed formulas
    pub names: Vec<String>,
}

impl Missing {
    pub fn run(&self, config: &Config) -> Result<()> {
        let ctx = GraphContext::load(config)?;
        ctx.print_diagnostics();

        let installed = ctx.registry.installed_name_set();
        for name in &self.names {
            if !installed.contains(name) {
                return Err(MaltError::NotFound(format!("'{name}' is not installed")));
            }
        }

        let mut gaps = ctx.report.graph.missing(&installed);
        if !self.names.is_empty() {
            gaps.retain(|name, _| self.names.contains(name));
        }

        let mut all_missing = BTreeSet::new();
        for (name, targets) in &gaps {
            println!("{name}: {}", targets.join(", "));
            all_missing.extend(targets.iter().cloned());
        }

        if all_missing.is_empty() {
            tracing::info!("all dependencies installed");
            Ok(())
        } else {
            Err(MaltError::MissingDependency(
                all_missing.into_iter().collect(),
            ))
        }
    }
}
