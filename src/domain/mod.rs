//! Domain logic - pure release rules independent of the hosting platform

pub mod glob;
pub mod label;
pub mod tag;
pub mod template;
pub mod version;

pub use glob::ComponentGlobs;
pub use label::{find_bumps, BumpLabelFormat, LabelPalette, LabelSpec};
pub use tag::{Tag, TagFormat};
pub use template::Template;
pub use version::{Version, VersionBump};
