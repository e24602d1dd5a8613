// malt-common/src/dependency/expr.rs
//! Guard-expression AST and its evaluator.
//!
//! The predicate language is a closed set: the parser refuses to build
//! anything outside the forms below, so evaluation never has to guess at
//! an unknown guard. Evaluation is pure, boolean and short-circuiting;
//! the only runtime failure is a tool-version comparison the descriptor
//! cannot answer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::platform::PlatformDescriptor;
use crate::model::version::{CmpOp, CpuArch, MacOSVersion, OsFamily, ToolVersion};

/// `:or_older` / `:or_newer` on an OS-version match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionModifier {
    OrOlder,
    OrNewer,
}

/// Predicate head of an `on_...` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockPredicate {
    /// `on_macos` / `on_linux`
    Os(OsFamily),
    /// `on_arm` / `on_intel` / `on_arch :arm|:intel`
    Arch(CpuArch),
    /// `on_mojave`, `on_mojave :or_newer`, ...; only matches on macOS.
    MacVersion {
        version: MacOSVersion,
        modifier: Option<VersionModifier>,
    },
    /// `on_system :linux, macos: :big_sur_or_newer`; clauses are OR-ed.
    System(Vec<SystemClause>),
}

/// One comma-separated clause of an `on_system` head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemClause {
    Linux,
    Macos,
    MacVersion {
        version: MacOSVersion,
        modifier: Option<VersionModifier>,
    },
}

/// Per-stanza guard (`depends_on ... if <clause>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guard {
    /// `MacOS.version >= :catalina`; false on Linux.
    MacosVersionCmp { op: CmpOp, version: MacOSVersion },
    /// `DevelopmentTools.clang_build_version <= 1400` and friends.
    ToolVersionCmp {
        tool: String,
        op: CmpOp,
        version: ToolVersion,
    },
    /// `build.with? "flag"`
    BuildWith(String),
    /// `build.without? "flag"`
    BuildWithout(String),
    /// `Formula["name"].any_version_installed?`
    AnyVersionInstalled(String),
}

fn version_matches(
    platform: &PlatformDescriptor,
    version: MacOSVersion,
    modifier: Option<VersionModifier>,
) -> bool {
    match modifier {
        None => platform.version_exactly(version),
        Some(VersionModifier::OrOlder) => platform.version_at_most(version),
        Some(VersionModifier::OrNewer) => platform.version_at_least(version),
    }
}

impl BlockPredicate {
    pub fn matches(&self, platform: &PlatformDescriptor) -> Result<bool> {
        match self {
            Self::Os(family) => Ok(platform.os_is(*family)),
            Self::Arch(arch) => Ok(platform.arch_is(*arch)),
            Self::MacVersion { version, modifier } => Ok(platform.os_is(OsFamily::Macos)
                && version_matches(platform, *version, *modifier)),
            Self::System(clauses) => {
                for clause in clauses {
                    if clause.matches(platform) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl SystemClause {
    fn matches(&self, platform: &PlatformDescriptor) -> bool {
        match self {
            Self::Linux => platform.os_is(OsFamily::Linux),
            Self::Macos => platform.os_is(OsFamily::Macos),
            Self::MacVersion { version, modifier } => {
                platform.os_is(OsFamily::Macos) && version_matches(platform, *version, *modifier)
            }
        }
    }
}

impl Guard {
    pub fn eval(&self, platform: &PlatformDescriptor) -> Result<bool> {
        match self {
            Self::MacosVersionCmp { op, version } => {
                if !platform.os_is(OsFamily::Macos) {
                    return Ok(false);
                }
                Ok(op.apply(platform.os_version().cmp(version)))
            }
            Self::ToolVersionCmp { tool, op, version } => {
                platform.tool_version_compare(tool, *op, version)
            }
            Self::BuildWith(flag) => Ok(platform.build_option_set(flag)),
            Self::BuildWithout(flag) => Ok(platform.build_option_unset(flag)),
            Self::AnyVersionInstalled(name) => Ok(platform.installed_version_of(name).is_some()),
        }
    }
}

impl fmt::Display for BlockPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Os(family) => write!(f, "on_{family}"),
            Self::Arch(CpuArch::Arm64) => write!(f, "on_arm"),
            Self::Arch(CpuArch::X86_64) => write!(f, "on_intel"),
            Self::MacVersion { version, modifier } => {
                write!(f, "on_{version}")?;
                match modifier {
                    Some(VersionModifier::OrOlder) => write!(f, " :or_older"),
                    Some(VersionModifier::OrNewer) => write!(f, " :or_newer"),
                    None => Ok(()),
                }
            }
            Self::System(_) => write!(f, "on_system"),
        }
    }
}
