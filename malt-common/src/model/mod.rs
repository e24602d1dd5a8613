// malt-common/src/model/mod.rs
pub mod formula;
pub mod platform;
pub mod version;

pub use formula::{Directive, FormulaDefinition};
pub use platform::PlatformDescriptor;
pub use version::{CmpOp, CpuArch, MacOSVersion, OsFamily, ToolVersion};
