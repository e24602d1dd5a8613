use clap::Args;
use colored::Colorize;
use malt_common::config::Config;
use malt_common::error::Result;
use malt_common::keg::KegRegistry;

#[derive(Args, Debug)]
pub struct List {
    /// Only pinned formulas
    #[arg(long)]
    pub pinned: bool,
}

impl List {
    pub fn run(&self, config: &Config) -> Result<()> {
        let registry = KegRegistry::load(config.clone())?;
        let mut shown = 0usize;
        for name in registry.installed_names() {
            if self.pinned && !registry.is_pinned(name) {
                continue;
            }
            shown += 1;
            let records = registry.versions(name);
            let versions: Vec<String> = records
                .iter()
                .map(|r| {
                    if r.linked {
                        format!("{}*", r.version)
                    } else {
                        r.version.clone()
                    }
                })
                .collect();
            let pin_marker = if registry.is_pinned(name) {
                " [pinned]".yellow().to_string()
            } else {
                String::new()
            };
            println!("{}: {}{}", name.bold(), versions.join(", "), pin_marker);
        }
        if shown == 0 {
            println!("{}", "no packages installed".yellow());
        }
        Ok(())
    }
}
