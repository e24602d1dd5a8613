use clap::Args;
use malt_common::config::Config;
use malt_common::error::Result;
use malt_common::keg::KegRegistry;
use malt_core::selector::VersionSelector;

#[derive(Args, Debug)]
pub struct Pin {
    /// Formulas to exclude from upgrades
    #[arg(required = true)]
    pub names: Vec<String>,
}

impl Pin {
    pub fn run(&self, config: &Config) -> Result<()> {
        let mut registry = KegRegistry::load(config.clone())?;
        let mut selector = VersionSelector::new(&mut registry);
        for name in &self.names {
            if selector.pin(name)? {
                println!("pinned {name}");
            }
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct Unpin {
    /// Formulas to allow upgrading again
    #[arg(required = true)]
    pub names: Vec<String>,
}

impl Unpin {
    pub fn run(&self, config: &Config) -> Result<()> {
        let mut registry = KegRegistry::load(config.clone())?;
        let mut selector = VersionSelector::new(&mut registry);
        for name in &self.names {
            if selector.unpin(name)? {
                println!("unpinned {name}");
            }
        }
        Ok(())
    }
}
