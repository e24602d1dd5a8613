use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Kind tags as declared on a stanza. A stanza may carry several at
    /// once (`=> [:build, :test]`); the resolver splits them into one
    /// requirement per kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DependencyTag: u8 {
        const RUNTIME     = 0b00000001;
        const BUILD       = 0b00000010;
        const TEST        = 0b00000100;
        const OPTIONAL    = 0b00001000;
        const RECOMMENDED = 0b00010000;
    }
}

impl Default for DependencyTag {
    fn default() -> Self {
        Self::RUNTIME
    }
}

impl fmt::Display for DependencyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl DependencyTag {
    /// The declared kinds, one at a time, in stable order.
    pub fn kinds(&self) -> impl Iterator<Item = DependencyKind> + '_ {
        DependencyKind::ALL
            .iter()
            .copied()
            .filter(|k| self.contains(k.tag()))
    }
}

/// Exactly-one classification carried by an emitted requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Runtime,
    Build,
    Test,
    Recommended,
    Optional,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 5] = [
        Self::Runtime,
        Self::Build,
        Self::Test,
        Self::Recommended,
        Self::Optional,
    ];

    pub fn tag(&self) -> DependencyTag {
        match self {
            Self::Runtime => DependencyTag::RUNTIME,
            Self::Build => DependencyTag::BUILD,
            Self::Test => DependencyTag::TEST,
            Self::Recommended => DependencyTag::RECOMMENDED,
            Self::Optional => DependencyTag::OPTIONAL,
        }
    }

    /// Symbol spelling in formula documents (`:build`, `:test`, ...).
    pub fn from_symbol(sym: &str) -> Option<Self> {
        match sym {
            "runtime" => Some(Self::Runtime),
            "build" => Some(Self::Build),
            "test" => Some(Self::Test),
            "recommended" => Some(Self::Recommended),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Runtime => "runtime",
            Self::Build => "build",
            Self::Test => "test",
            Self::Recommended => "recommended",
            Self::Optional => "optional",
        };
        write!(f, "{s}")
    }
}
