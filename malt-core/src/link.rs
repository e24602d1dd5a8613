// malt-core/src/link.rs
//! Filesystem activation of a keg: the `opt/<name>` symlink that marks
//! the active version. The link is written to a staging path and moved
//! into place with `rename`, so an interrupted activation leaves either
//! the previous link or the new one, never a half-written state.

use std::fs;
#[cfg(unix)]
use std::os::unix::fs as unix_fs;
use std::path::PathBuf;

use malt_common::config::Config;
use malt_common::error::{MaltError, Result};
use tracing::debug;

fn staging_path(config: &Config, name: &str) -> PathBuf {
    config.opt_dir().join(format!(".{name}.staging"))
}

/// Point `opt/<name>` at the keg for `version`.
pub fn activate_keg(config: &Config, name: &str, version: &str) -> Result<()> {
    let keg_path = config.formula_keg_path(name, version);
    if !keg_path.is_dir() {
        return Err(MaltError::VersionNotInstalled {
            formula: name.to_string(),
            version: version.to_string(),
        });
    }

    fs::create_dir_all(config.opt_dir())?;
    let staging = staging_path(config, name);
    if staging.symlink_metadata().is_ok() {
        fs::remove_file(&staging)?;
    }

    #[cfg(unix)]
    unix_fs::symlink(&keg_path, &staging).map_err(|e| {
        MaltError::Io(std::sync::Arc::new(std::io::Error::new(
            e.kind(),
            format!("Failed to stage opt symlink for {name}: {e}"),
        )))
    })?;
    #[cfg(not(unix))]
    return Err(MaltError::Generic(
        "symlink activation requires a unix filesystem".to_string(),
    ));

    let opt_link = config.formula_opt_path(name);
    fs::rename(&staging, &opt_link)?;
    debug!(
        "Activated {}: {} -> {}",
        name,
        opt_link.display(),
        keg_path.display()
    );
    Ok(())
}

/// Remove `opt/<name>` if present. Idempotent.
pub fn deactivate_keg(config: &Config, name: &str) -> Result<()> {
    let opt_link = config.formula_opt_path(name);
    match opt_link.symlink_metadata() {
        Ok(_) => {
            fs::remove_file(&opt_link)?;
            debug!("Deactivated {}: removed {}", name, opt_link.display());
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

/// Ensure the keg directory for a version exists (payload delivery is
/// the fetch collaborator's job).
pub fn provision_keg_dir(config: &Config, name: &str, version: &str) -> Result<PathBuf> {
    let keg_path = config.formula_keg_path(name, version);
    fs::create_dir_all(&keg_path)?;
    Ok(keg_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_swaps_and_deactivate_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        provision_keg_dir(&config, "wget", "1.0").unwrap();
        provision_keg_dir(&config, "wget", "2.0").unwrap();

        activate_keg(&config, "wget", "1.0").unwrap();
        let opt = config.formula_opt_path("wget");
        assert_eq!(
            fs::read_link(&opt).unwrap(),
            config.formula_keg_path("wget", "1.0")
        );

        // rename replaces the old link in one step
        activate_keg(&config, "wget", "2.0").unwrap();
        assert_eq!(
            fs::read_link(&opt).unwrap(),
            config.formula_keg_path("wget", "2.0")
        );

        deactivate_keg(&config, "wget").unwrap();
        assert!(opt.symlink_metadata().is_err());
        deactivate_keg(&config, "wget").unwrap();
    }

    #[test]
    fn activate_unknown_version_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        assert!(matches!(
            activate_keg(&config, "wget", "9.9"),
            Err(MaltError::VersionNotInstalled { .. })
        ));
    }
}
