// malt-common/src/model/platform.rs
//! Immutable snapshot of the target machine, constructed once per
//! invocation and threaded read-only through guard evaluation.

use std::collections::{HashMap, HashSet};
use std::env;
use std::process::Command;

use tracing::debug;

use super::version::{CmpOp, CpuArch, MacOSVersion, OsFamily, ToolVersion};
use crate::error::{MaltError, Result};

#[derive(Debug, Clone)]
pub struct PlatformDescriptor {
    os: OsFamily,
    os_version: MacOSVersion,
    arch: CpuArch,
    tool_versions: HashMap<String, ToolVersion>,
    build_options: HashSet<String>,
    installed_versions: HashMap<String, String>,
}

impl PlatformDescriptor {
    pub fn new(os: OsFamily, os_version: MacOSVersion, arch: CpuArch) -> Self {
        Self {
            os,
            os_version,
            arch,
            tool_versions: HashMap::new(),
            build_options: HashSet::new(),
            installed_versions: HashMap::new(),
        }
    }

    /// Probe the host machine. The OS version can be overridden with
    /// MALT_OS_VERSION (symbolic name); on macOS it is otherwise read from
    /// `sw_vers`. Tool versions default to zero when a probe fails, the
    /// same answer the tools give on a machine without them.
    pub fn detect(installed_versions: HashMap<String, String>) -> Result<Self> {
        let os = if cfg!(target_os = "macos") {
            OsFamily::Macos
        } else {
            OsFamily::Linux
        };
        let arch = if cfg!(target_arch = "aarch64") {
            CpuArch::Arm64
        } else {
            CpuArch::X86_64
        };

        let os_version = match env::var("MALT_OS_VERSION").ok().filter(|s| !s.is_empty()) {
            Some(name) => name.parse()?,
            None if os == OsFamily::Macos => {
                let out = Command::new("sw_vers")
                    .arg("-productVersion")
                    .output()
                    .map_err(|e| MaltError::Platform(format!("sw_vers failed: {e}")))?;
                let raw = String::from_utf8_lossy(&out.stdout).trim().to_string();
                MacOSVersion::from_numeric(&raw)?
            }
            // Never consulted on Linux; pick the bottom of the order.
            None => MacOSVersion::Yosemite,
        };

        let mut platform = Self::new(os, os_version, arch);
        for (tool, cmd, args, pattern) in [
            ("clang", "clang", &["--version"][..], "clang-"),
            ("gcc", "gcc", &["-dumpversion"][..], ""),
        ] {
            platform
                .tool_versions
                .insert(tool.to_string(), probe_tool_version(cmd, args, pattern));
        }
        platform
            .tool_versions
            .insert("xcode".to_string(), ToolVersion::ZERO);

        platform.installed_versions = installed_versions;
        debug!(
            "Detected platform: {} {} on {}",
            platform.os, platform.os_version, platform.arch
        );
        Ok(platform)
    }

    pub fn with_tool(mut self, name: impl Into<String>, version: ToolVersion) -> Self {
        self.tool_versions.insert(name.into(), version);
        self
    }

    pub fn with_build_option(mut self, name: impl Into<String>) -> Self {
        self.build_options.insert(name.into());
        self
    }

    pub fn with_installed(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.installed_versions.insert(name.into(), version.into());
        self
    }

    pub fn os_is(&self, family: OsFamily) -> bool {
        self.os == family
    }

    pub fn arch_is(&self, arch: CpuArch) -> bool {
        self.arch == arch
    }

    pub fn os_version(&self) -> MacOSVersion {
        self.os_version
    }

    /// "exactly version v"
    pub fn version_exactly(&self, v: MacOSVersion) -> bool {
        self.os_version == v
    }

    /// "version v or newer"
    pub fn version_at_least(&self, v: MacOSVersion) -> bool {
        self.os_version >= v
    }

    /// "version v or older"
    pub fn version_at_most(&self, v: MacOSVersion) -> bool {
        self.os_version <= v
    }

    /// Compare the descriptor's tool version against `rhs`. A tool the
    /// descriptor has no entry for cannot be answered and is a guard
    /// evaluation error, not a silent false.
    pub fn tool_version_compare(&self, tool: &str, op: CmpOp, rhs: &ToolVersion) -> Result<bool> {
        let current = self.tool_versions.get(tool).ok_or_else(|| {
            MaltError::GuardEvaluation(format!("no version recorded for tool '{tool}'"))
        })?;
        Ok(op.apply(current.cmp(rhs)))
    }

    /// Tool version for requirement diagnostics; absent tools read as zero.
    pub fn tool_version_or_zero(&self, tool: &str) -> ToolVersion {
        self.tool_versions
            .get(tool)
            .cloned()
            .unwrap_or(ToolVersion::ZERO)
    }

    pub fn build_option_set(&self, name: &str) -> bool {
        self.build_options.contains(name)
    }

    pub fn build_option_unset(&self, name: &str) -> bool {
        !self.build_options.contains(name)
    }

    pub fn installed_version_of(&self, name: &str) -> Option<&str> {
        self.installed_versions.get(name).map(String::as_str)
    }
}

fn probe_tool_version(cmd: &str, args: &[&str], pattern: &str) -> ToolVersion {
    let output = match Command::new(cmd).args(args).output() {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).to_string(),
        _ => {
            debug!("tool probe '{cmd}' failed, assuming version 0");
            return ToolVersion::ZERO;
        }
    };
    // first dotted-digit run after the pattern (or anywhere if empty)
    let haystack = match output.find(pattern) {
        Some(pos) => &output[pos + pattern.len()..],
        None => return ToolVersion::ZERO,
    };
    let digits: String = haystack
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.trim_matches('.').parse().unwrap_or(ToolVersion::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(v: MacOSVersion) -> PlatformDescriptor {
        PlatformDescriptor::new(OsFamily::Macos, v, CpuArch::Arm64)
    }

    #[test]
    fn version_modifier_queries() {
        let p = mac(MacOSVersion::Monterey);
        assert!(p.version_exactly(MacOSVersion::Monterey));
        assert!(!p.version_exactly(MacOSVersion::Ventura));
        assert!(p.version_at_least(MacOSVersion::Mojave));
        assert!(!p.version_at_least(MacOSVersion::Sonoma));
        assert!(p.version_at_most(MacOSVersion::Sonoma));
        assert!(!p.version_at_most(MacOSVersion::Mojave));
    }

    #[test]
    fn tool_compare_requires_a_recorded_version() {
        let p = mac(MacOSVersion::Sonoma).with_tool("clang", ToolVersion::new(vec![1403]));
        assert!(p
            .tool_version_compare("clang", CmpOp::Le, &ToolVersion::new(vec![1500]))
            .unwrap());
        assert!(matches!(
            p.tool_version_compare("gcc", CmpOp::Lt, &ToolVersion::new(vec![9])),
            Err(MaltError::GuardEvaluation(_))
        ));
        assert_eq!(p.tool_version_or_zero("gcc"), ToolVersion::ZERO);
    }

    #[test]
    fn build_options_and_installed_lookup() {
        let p = mac(MacOSVersion::Sonoma)
            .with_build_option("ldap")
            .with_installed("zlib", "1.3");
        assert!(p.build_option_set("ldap"));
        assert!(p.build_option_unset("kerberos"));
        assert_eq!(p.installed_version_of("zlib"), Some("1.3"));
        assert_eq!(p.installed_version_of("openssl"), None);
    }
}
