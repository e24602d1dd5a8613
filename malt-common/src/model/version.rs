// malt-common/src/model/version.rs
//! Fixed reference data for platform matching: the closed macOS version
//! ordering, CPU architectures, OS families and dotted tool versions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MaltError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Macos,
    Linux,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Macos => write!(f, "macos"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuArch {
    Arm64,
    X86_64,
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arm64 => write!(f, "arm64"),
            Self::X86_64 => write!(f, "x86_64"),
        }
    }
}

/// The closed, totally ordered set of known macOS releases (oldest first).
/// Version guards naming anything outside this list are a resolution error,
/// never a silent false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacOSVersion {
    Yosemite,
    ElCapitan,
    Sierra,
    HighSierra,
    Mojave,
    Catalina,
    BigSur,
    Monterey,
    Ventura,
    Sonoma,
    Sequoia,
    Tahoe,
}

impl MacOSVersion {
    pub const ALL: [MacOSVersion; 12] = [
        Self::Yosemite,
        Self::ElCapitan,
        Self::Sierra,
        Self::HighSierra,
        Self::Mojave,
        Self::Catalina,
        Self::BigSur,
        Self::Monterey,
        Self::Ventura,
        Self::Sonoma,
        Self::Sequoia,
        Self::Tahoe,
    ];

    /// The symbolic name as it appears in formula documents.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yosemite => "yosemite",
            Self::ElCapitan => "el_capitan",
            Self::Sierra => "sierra",
            Self::HighSierra => "high_sierra",
            Self::Mojave => "mojave",
            Self::Catalina => "catalina",
            Self::BigSur => "big_sur",
            Self::Monterey => "monterey",
            Self::Ventura => "ventura",
            Self::Sonoma => "sonoma",
            Self::Sequoia => "sequoia",
            Self::Tahoe => "tahoe",
        }
    }

    /// Marketing version number ("10.10" through "26").
    pub fn numeric(&self) -> &'static str {
        match self {
            Self::Yosemite => "10.10",
            Self::ElCapitan => "10.11",
            Self::Sierra => "10.12",
            Self::HighSierra => "10.13",
            Self::Mojave => "10.14",
            Self::Catalina => "10.15",
            Self::BigSur => "11",
            Self::Monterey => "12",
            Self::Ventura => "13",
            Self::Sonoma => "14",
            Self::Sequoia => "15",
            Self::Tahoe => "26",
        }
    }

    /// Resolve a marketing version ("14", "10.13", "13.4.1") to its release.
    pub fn from_numeric(s: &str) -> Result<Self> {
        let key = if let Some(minor) = s.strip_prefix("10.") {
            // 10.x releases are distinguished by their minor number
            let minor = minor.split('.').next().unwrap_or(minor);
            format!("10.{minor}")
        } else {
            s.split('.').next().unwrap_or(s).to_string()
        };
        Self::ALL
            .iter()
            .find(|v| v.numeric() == key)
            .copied()
            .ok_or_else(|| MaltError::Platform(format!("unsupported macOS version '{s}'")))
    }
}

impl FromStr for MacOSVersion {
    type Err = MaltError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|v| v.name() == s)
            .copied()
            .ok_or_else(|| MaltError::Platform(format!("unknown macOS version name '{s}'")))
    }
}

impl fmt::Display for MacOSVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A development-tool version: dotted unsigned integers ("1403", "9.2"),
/// compared componentwise with implicit zero padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolVersion(pub Vec<u32>);

impl ToolVersion {
    pub const ZERO: ToolVersion = ToolVersion(Vec::new());

    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }
}

impl FromStr for ToolVersion {
    type Err = MaltError;

    fn from_str(s: &str) -> Result<Self> {
        let components: std::result::Result<Vec<u32>, _> =
            s.split('.').map(|c| c.parse::<u32>()).collect();
        components
            .map(Self)
            .map_err(|_| MaltError::Platform(format!("invalid tool version '{s}'")))
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.0.len().max(other.0.len());
        for i in 0..max_len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Relational operator in version guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl CmpOp {
    pub fn apply(&self, ord: Ordering) -> bool {
        match self {
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
            Self::Eq => ord == Ordering::Equal,
        }
    }
}

impl FromStr for CmpOp {
    type Err = MaltError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "==" => Ok(Self::Eq),
            _ => Err(MaltError::Platform(format!("unknown comparison '{s}'"))),
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
        };
        write!(f, "{s}")
    }
}
