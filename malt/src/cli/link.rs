use clap::Args;
use colored::Colorize;
use malt_common::config::Config;
use malt_common::error::{MaltError, Result};
use malt_common::keg::KegRegistry;
use malt_core::selector::VersionSelector;

#[derive(Args, Debug)]
pub struct Link {
    /// Installed formula to activate
    pub name: String,
    /// Version to link; may be omitted when only one is installed
    pub version: Option<String>,
}

impl Link {
    pub fn run(&self, config: &Config) -> Result<()> {
        let mut registry = KegRegistry::load(config.clone())?;
        let version = match &self.version {
            Some(v) => v.clone(),
            None => {
                let records = registry.versions(&self.name);
                match records.len() {
                    1 => records[0].version.clone(),
                    0 => {
                        return Err(MaltError::NotFound(format!(
                            "'{}' is not installed",
                            self.name
                        )))
                    }
                    _ => {
                        let versions: Vec<&str> =
                            records.iter().map(|r| r.version.as_str()).collect();
                        return Err(MaltError::Generic(format!(
                            "multiple versions installed ({}); pass one explicitly",
                            versions.join(", ")
                        )));
                    }
                }
            }
        };
        VersionSelector::new(&mut registry).link(&self.name, &version)?;
        println!("{} Linked {} {version}", "==>".green(), self.name.bold());
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct Unlink {
    /// Installed formula to deactivate
    pub name: String,
}

impl Unlink {
    pub fn run(&self, config: &Config) -> Result<()> {
        let mut registry = KegRegistry::load(config.clone())?;
        let previous = registry.linked_version(&self.name).map(str::to_string);
        VersionSelector::new(&mut registry).unlink(&self.name)?;
        match previous {
            Some(version) => println!(
                "{} Unlinked {} {version}",
                "==>".green(),
                self.name.bold()
            ),
            None => println!("{} was not linked", self.name),
        }
        Ok(())
    }
}
