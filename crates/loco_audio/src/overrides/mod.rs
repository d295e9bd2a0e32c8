//! Override definitions, per-vehicle override sets and the sound catalog

pub mod catalog;
pub mod definition;

pub use catalog::SoundCatalog;
pub use definition::{OverrideDefinition, OverrideSet};
