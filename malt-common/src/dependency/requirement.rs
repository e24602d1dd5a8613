use std::fmt;

use serde::{Deserialize, Serialize};

use super::definition::DependencyKind;
use crate::model::version::{CpuArch, MacOSVersion, ToolVersion};

/// Host-system requirement declared by a formula (`depends_on :macos`,
/// `depends_on arch: :arm64`, ...). Requirements never create graph
/// edges; unmet ones become "unsupported platform" diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    Macos,
    Linux,
    Arch(CpuArch),
    MacosAtLeast(MacOSVersion),
    MacosAtMost(MacOSVersion),
    Xcode { min: Option<ToolVersion> },
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Macos => write!(f, "macOS only"),
            Self::Linux => write!(f, "Linux only"),
            Self::Arch(a) => write!(f, "{a} only"),
            Self::MacosAtLeast(v) => write!(f, "needs macOS >= {}", v.numeric()),
            Self::MacosAtMost(v) => write!(f, "needs macOS <= {}", v.numeric()),
            Self::Xcode { min: Some(v) } => write!(f, "needs Xcode >= {v}"),
            Self::Xcode { min: None } => write!(f, "needs Xcode"),
        }
    }
}

/// One normalized dependency emitted by the resolver: a single kind,
/// carrying the stanza's option tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRequirement {
    pub source: String,
    pub target: String,
    pub kind: DependencyKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl DependencyRequirement {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: DependencyKind,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Display for DependencyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.source, self.target, self.kind)
    }
}
