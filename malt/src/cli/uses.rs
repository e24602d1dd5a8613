use clap::Args;
use malt_common::config::Config;
use malt_common::dependency::graph::KindFilter;
use malt_common::error::{MaltError, Result};

use crate::cli::GraphContext;

#[derive(Args, Debug)]
pub struct Uses {
    /// Formulas whose dependents to show
    pub names: Vec<String>,

    /// Render dependents as an indented tree
    #[arg(long, conflicts_with = "dot")]
    pub tree: bool,

    /// Render as a Graphviz digraph (edges reversed)
    #[arg(long)]
    pub dot: bool,
}

impl Uses {
    pub fn run(&self, config: &Config) -> Result<()> {
        let ctx = GraphContext::load(config)?;
        ctx.print_diagnostics();
        let graph = &ctx.report.graph;

        let names: Vec<String> = if self.names.is_empty() {
            graph.formulas().iter().cloned().collect()
        } else {
            for name in &self.names {
                if !graph.contains(name) {
                    return Err(MaltError::NotFound(format!("unknown formula '{name}'")));
                }
            }
            self.names.clone()
        };

        if self.dot {
            print!(
                "{}",
                graph.render_dot(&names, KindFilter::everything(), true)
            );
        } else if self.tree {
            for name in &names {
                println!("{name}");
                let dependents = graph.reverse_deps(name);
                for (i, dependent) in dependents.iter().enumerate() {
                    let last = i + 1 == dependents.len();
                    println!("{}{dependent}", if last { "└─ " } else { "├─ " });
                }
            }
        } else {
            for name in &names {
                let mut dependents = graph.transitive_dependents(name);
                dependents.sort_unstable();
                println!("{name} <= {}", dependents.join(", "));
            }
        }
        Ok(())
    }
}
