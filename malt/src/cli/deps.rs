use clap::Args;
use malt_common::config::Config;
use malt_common::dependency::graph::KindFilter;
use malt_common::error::{MaltError, Result};

use crate::cli::GraphContext;

#[derive(Args, Debug)]
pub struct Deps {
    /// Formulas to inspect (defaults to every known formula)
    pub names: Vec<String>,

    /// Render as an indented tree
    #[arg(long, conflicts_with = "dot")]
    pub tree: bool,

    /// Render as a Graphviz digraph
    #[arg(long)]
    pub dot: bool,

    /// Follow build-time edges too
    #[arg(long)]
    pub include_build: bool,

    /// Follow test-time edges too
    #[arg(long)]
    pub include_test: bool,
}

impl Deps {
    pub fn run(&self, config: &Config) -> Result<()> {
        let ctx = GraphContext::load(config)?;
        ctx.print_diagnostics();
        let graph = &ctx.report.graph;

        let filter = KindFilter::default()
            .include_build(self.include_build)
            .include_test(self.include_test);

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
            print!("{}", graph.render_dot(&names, filter, false));
        } else if self.tree {
            for name in &names {
                print!("{}", graph.render_tree(name, filter));
            }
        } else {
            for name in &names {
                let mut deps = graph.transitive_deps(name, filter);
                deps.sort_unstable();
                println!("{name} => {}", deps.join(", "));
            }
        }
        Ok(())
    }
}
