//! Audio scene graph consumed by the override engine
//!
//! The host simulation owns the real audio objects; this module models the
//! part of them the engine needs: a tree of named nodes, two recognizable
//! audio shapes, per-type prefabs and the vehicle instances built from them.

pub mod builder;
pub mod clip;
pub mod graph;
pub mod node;

pub use builder::PrefabBuilder;
pub use clip::{AudioFormat, Clip, ClipLoader, FsClipLoader, OpaqueClipLoader};
pub use graph::{AudioScene, VehicleInstance, Visit};
pub use node::{AudioComponent, AudioLayer, ClipSet, LayerSource, LayeredAudio, SceneNode};

slotmap::new_key_type! {
    /// Generational handle to a node of the audio scene
    pub struct NodeKey;

    /// Generational handle to a live vehicle instance
    pub struct InstanceKey;
}
