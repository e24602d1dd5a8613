use clap::Args;
use colored::Colorize;
use malt_common::config::Config;
use malt_common::error::Result;
use malt_common::keg::KegRegistry;
use malt_core::selector::VersionSelector;

#[derive(Args, Debug)]
pub struct Switch {
    /// Installed formula to change
    pub name: String,
    /// Already-installed version to activate
    pub version: String,
}

impl Switch {
    pub fn run(&self, config: &Config) -> Result<()> {
        let mut registry = KegRegistry::load(config.clone())?;
        VersionSelector::new(&mut registry).switch(&self.name, &self.version)?;
        println!(
            "{} switched {} to {}",
            "==>".green(),
            self.name.bold(),
            self.version
        );
        Ok(())
    }
}
