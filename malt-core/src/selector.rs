// malt-core/src/selector.rs
//! Version selector: the state machine over installed-version records.
//! States per record are `linked`/`unlinked` with an orthogonal `pinned`
//! flag; at most one version of a formula is linked at a time. All
//! registry mutation in the system funnels through here.

use malt_common::config::Config;
use malt_common::error::{MaltError, Result};
use malt_common::keg::{InstalledVersionRecord, KegRegistry};
use tracing::{debug, warn};

use crate::link;

/// Result of an `upgrade` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Upgraded { from: Vec<String>, to: String },
    /// Non-fatal notice: the formula is pinned and no override was given.
    SkippedPinned,
    AlreadyCurrent,
}

pub struct VersionSelector<'a> {
    registry: &'a mut KegRegistry,
    config: Config,
}

impl<'a> VersionSelector<'a> {
    pub fn new(registry: &'a mut KegRegistry) -> Self {
        let config = registry.config().clone();
        Self { registry, config }
    }

    /// Create the record for a freshly delivered keg; new installs come
    /// up linked.
    pub fn install(&mut self, name: &str, version: &str) -> Result<()> {
        if self
            .registry
            .versions(name)
            .iter()
            .any(|r| r.version == version)
        {
            debug!("'{name}' {version} already installed");
            return Ok(());
        }
        link::provision_keg_dir(&self.config, name, version)?;
        let pinned = self.registry.is_pinned(name);
        self.registry.insert_version(
            name,
            InstalledVersionRecord {
                version: version.to_string(),
                linked: false,
                pinned,
            },
        );
        self.activate(name, version)?;
        self.registry.save()
    }

    /// Link a version. Re-linking the linked version is a no-op; a
    /// different version being linked is an error so the caller unlinks
    /// deliberately rather than us silently unseating it.
    pub fn link(&mut self, name: &str, version: &str) -> Result<()> {
        self.assert_version_installed(name, version)?;
        match self.registry.linked_version(name) {
            Some(current) if current == version => {
                debug!("'{name}' already linked to {version}");
                return Ok(());
            }
            Some(current) => {
                return Err(MaltError::AlreadyLinked {
                    formula: name.to_string(),
                    version: current.to_string(),
                });
            }
            None => {}
        }
        self.activate(name, version)?;
        self.registry.save()
    }

    /// Unlink whatever is linked. Idempotent.
    pub fn unlink(&mut self, name: &str) -> Result<()> {
        self.assert_installed(name)?;
        if self.registry.linked_version(name).is_none() {
            debug!("'{name}' is not linked, nothing to do");
            return Ok(());
        }
        link::deactivate_keg(&self.config, name)?;
        if let Some(records) = self.registry.records_mut(name) {
            for record in records.iter_mut() {
                record.linked = false;
            }
        }
        self.registry.save()
    }

    /// Atomically relink to another installed version.
    pub fn switch(&mut self, name: &str, version: &str) -> Result<()> {
        self.assert_version_installed(name, version)?;
        if self.registry.linked_version(name) == Some(version) {
            debug!("'{name}' already on {version}");
            return Ok(());
        }
        // activation renames over the old link in one step
        self.activate(name, version)?;
        self.registry.save()
    }

    pub fn pin(&mut self, name: &str) -> Result<bool> {
        self.assert_installed(name)?;
        let changed = self.set_pinned(name, true);
        self.registry.save()?;
        Ok(changed)
    }

    pub fn unpin(&mut self, name: &str) -> Result<bool> {
        self.assert_installed(name)?;
        let changed = self.set_pinned(name, false);
        self.registry.save()?;
        Ok(changed)
    }

    /// Install and link a newer version, pruning unpinned older ones.
    /// Pinned formulas are skipped with a notice unless `force` is set.
    pub fn upgrade(&mut self, name: &str, version: &str, force: bool) -> Result<UpgradeOutcome> {
        self.assert_installed(name)?;
        if self
            .registry
            .versions(name)
            .iter()
            .any(|r| r.version == version)
        {
            return Ok(UpgradeOutcome::AlreadyCurrent);
        }
        if self.registry.is_pinned(name) && !force {
            warn!("'{name}' is pinned, skipping upgrade to {version}");
            return Ok(UpgradeOutcome::SkippedPinned);
        }

        let old_versions: Vec<String> = self
            .registry
            .versions(name)
            .iter()
            .map(|r| r.version.clone())
            .collect();

        self.install(name, version)?;

        for old in &old_versions {
            let pinned = self
                .registry
                .versions(name)
                .iter()
                .find(|r| r.version == *old)
                .map(|r| r.pinned)
                .unwrap_or(false);
            if pinned {
                warn!("keeping old version {old} of '{name}' (reason: pinned)");
                continue;
            }
            self.registry.remove_version(name, old);
            let keg = self.config.formula_keg_path(name, old);
            if keg.is_dir() {
                std::fs::remove_dir_all(&keg)?;
            }
        }
        self.registry.save()?;
        Ok(UpgradeOutcome::Upgraded {
            from: old_versions,
            to: version.to_string(),
        })
    }

    pub fn uninstall(&mut self, name: &str) -> Result<()> {
        self.assert_installed(name)?;
        link::deactivate_keg(&self.config, name)?;
        for record in self.registry.versions(name).to_vec() {
            let keg = self.config.formula_keg_path(name, &record.version);
            if keg.is_dir() {
                std::fs::remove_dir_all(&keg)?;
            }
            self.registry.remove_version(name, &record.version);
        }
        self.registry.save()
    }

    // ----- helpers ----------------------------------------------------------

    fn activate(&mut self, name: &str, version: &str) -> Result<()> {
        link::activate_keg(&self.config, name, version)?;
        if let Some(records) = self.registry.records_mut(name) {
            for record in records.iter_mut() {
                record.linked = record.version == version;
            }
        }
        Ok(())
    }

    fn set_pinned(&mut self, name: &str, flag: bool) -> bool {
        let mut changed = false;
        if let Some(records) = self.registry.records_mut(name) {
            for record in records.iter_mut() {
                if record.pinned != flag {
                    record.pinned = flag;
                    changed = true;
                }
            }
        }
        changed
    }

    fn assert_installed(&self, name: &str) -> Result<()> {
        if !self.registry.is_installed(name) {
            return Err(MaltError::NotFound(format!("'{name}' is not installed")));
        }
        Ok(())
    }

    fn assert_version_installed(&self, name: &str, version: &str) -> Result<()> {
        self.assert_installed(name)?;
        if !self
            .registry
            .versions(name)
            .iter()
            .any(|r| r.version == version)
        {
            return Err(MaltError::VersionNotInstalled {
                formula: name.to_string(),
                version: version.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, KegRegistry) {
        let tmp = tempfile::tempdir().unwrap();
        let registry = KegRegistry::empty(Config::with_root(tmp.path()));
        (tmp, registry)
    }

    #[test]
    fn install_links_by_default() {
        let (_tmp, mut registry) = setup();
        VersionSelector::new(&mut registry)
            .install("wget", "1.24.5")
            .unwrap();
        assert_eq!(registry.linked_version("wget"), Some("1.24.5"));
    }

    #[test]
    fn link_is_idempotent_but_guards_other_versions() {
        let (_tmp, mut registry) = setup();
        {
            let mut selector = VersionSelector::new(&mut registry);
            selector.install("node", "20.9.0").unwrap();
            selector.install("node", "22.1.0").unwrap();
            // second install linked 22.1.0; relinking it twice is fine
            selector.link("node", "22.1.0").unwrap();
            selector.link("node", "22.1.0").unwrap();
            // linking a different version while one is linked is refused
            assert!(matches!(
                selector.link("node", "20.9.0"),
                Err(MaltError::AlreadyLinked { .. })
            ));
        }
        assert_eq!(registry.linked_version("node"), Some("22.1.0"));
    }

    #[test]
    fn unlink_twice_is_a_no_op() {
        let (_tmp, mut registry) = setup();
        {
            let mut selector = VersionSelector::new(&mut registry);
            selector.install("wget", "1.0").unwrap();
            selector.unlink("wget").unwrap();
            selector.unlink("wget").unwrap();
        }
        assert_eq!(registry.linked_version("wget"), None);
        assert!(registry.is_installed("wget"));
    }

    #[test]
    fn switch_requires_installed_target() {
        let (_tmp, mut registry) = setup();
        let mut selector = VersionSelector::new(&mut registry);
        selector.install("pkg", "1.0").unwrap();
        assert!(matches!(
            selector.switch("pkg", "2.0"),
            Err(MaltError::VersionNotInstalled { .. })
        ));
    }

    #[test]
    fn switch_relinks_between_installed_versions() {
        let (_tmp, mut registry) = setup();
        {
            let mut selector = VersionSelector::new(&mut registry);
            selector.install("pkg", "1.0").unwrap();
            selector.install("pkg", "2.0").unwrap();
            selector.switch("pkg", "1.0").unwrap();
        }
        assert_eq!(registry.linked_version("pkg"), Some("1.0"));
        let opt = registry.config().formula_opt_path("pkg");
        assert_eq!(
            std::fs::read_link(opt).unwrap(),
            registry.config().formula_keg_path("pkg", "1.0")
        );
    }

    #[test]
    fn pinned_upgrade_is_skipped_without_force() {
        let (_tmp, mut registry) = setup();
        {
            let mut selector = VersionSelector::new(&mut registry);
            selector.install("pkg", "1.0").unwrap();
            selector.pin("pkg").unwrap();
            assert_eq!(
                selector.upgrade("pkg", "2.0", false).unwrap(),
                UpgradeOutcome::SkippedPinned
            );
        }
        assert_eq!(registry.linked_version("pkg"), Some("1.0"));
        assert!(registry.is_pinned("pkg"));
    }

    #[test]
    fn forced_upgrade_replaces_and_prunes() {
        let (_tmp, mut registry) = setup();
        {
            let mut selector = VersionSelector::new(&mut registry);
            selector.install("pkg", "1.0").unwrap();
            let outcome = selector.upgrade("pkg", "2.0", false).unwrap();
            assert_eq!(
                outcome,
                UpgradeOutcome::Upgraded {
                    from: vec!["1.0".to_string()],
                    to: "2.0".to_string(),
                }
            );
        }
        assert_eq!(registry.linked_version("pkg"), Some("2.0"));
        assert_eq!(registry.versions("pkg").len(), 1);
        assert!(!registry
            .config()
            .formula_keg_path("pkg", "1.0")
            .exists());
    }

    #[test]
    fn pin_and_unpin_report_changes() {
        let (_tmp, mut registry) = setup();
        let mut selector = VersionSelector::new(&mut registry);
        selector.install("pkg", "1.0").unwrap();
        assert!(selector.pin("pkg").unwrap());
        assert!(!selector.pin("pkg").unwrap());
        assert!(selector.unpin("pkg").unwrap());
        assert!(!selector.unpin("pkg").unwrap());
    }

    #[test]
    fn registry_survives_reload_after_transitions() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        {
            let mut registry = KegRegistry::empty(config.clone());
            let mut selector = VersionSelector::new(&mut registry);
            selector.install("pkg", "1.0").unwrap();
            selector.install("pkg", "2.0").unwrap();
            selector.switch("pkg", "1.0").unwrap();
            selector.pin("pkg").unwrap();
        }
        let reloaded = KegRegistry::load(config).unwrap();
        assert_eq!(reloaded.linked_version("pkg"), Some("1.0"));
        assert!(reloaded.is_pinned("pkg"));
        assert_eq!(reloaded.versions("pkg").len(), 2);
    }
}
