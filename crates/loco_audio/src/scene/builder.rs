//! Fluent construction of prefab audio graphs
//!
//! Hosts describe a vehicle type's audio layout by slash-separated paths;
//! intermediate group nodes are created on demand.
//!
//! ```
//! use loco_audio::catalog::VehicleType;
//! use loco_audio::scene::{AudioScene, PrefabBuilder};
//!
//! let mut scene = AudioScene::new();
//! PrefabBuilder::new(&mut scene, "DE6 Audio")
//!     .multi_layer("Horn/HornLoop", "Clip", &["de6_horn_loop"])
//!     .clip_set("Horn/HornHit", "hits", &["de6_horn_hit_01", "de6_horn_hit_02"])
//!     .finish(VehicleType::DE6);
//! assert!(scene.prefab_root(&VehicleType::DE6).is_some());
//! ```

use super::clip::Clip;
use super::graph::AudioScene;
use super::node::{AudioComponent, AudioLayer, ClipSet, LayeredAudio};
use super::NodeKey;
use crate::catalog::VehicleType;

/// Layered object with one layer per clip name
pub fn layered(object_name: &str, clips: &[&str]) -> LayeredAudio {
    let layers = clips
        .iter()
        .enumerate()
        .map(|(i, clip)| AudioLayer::new(format!("layer{i}"), Some(Clip::named(*clip))))
        .collect();
    LayeredAudio::new(object_name, layers)
}

/// Clip set holding the named clips
pub fn clip_set(object_name: &str, clips: &[&str]) -> ClipSet {
    ClipSet::new(object_name, clips.iter().map(|c| Clip::named(*c)).collect())
}

/// Builds one prefab subtree inside an [`AudioScene`]
pub struct PrefabBuilder<'a> {
    scene: &'a mut AudioScene,
    root: NodeKey,
}

impl<'a> PrefabBuilder<'a> {
    /// Start a new prefab rooted at a node called `root_name`
    pub fn new(scene: &'a mut AudioScene, root_name: &str) -> Self {
        let root = scene.add_node(None, root_name, None);
        Self { scene, root }
    }

    /// Root of the prefab being built
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Node at `path`, creating empty group nodes along the way
    pub fn ensure_path(&mut self, path: &str) -> NodeKey {
        let mut current = self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let existing = self.scene.node(current).and_then(|node| {
                node.children
                    .iter()
                    .copied()
                    .find(|c| self.scene.node(*c).is_some_and(|n| n.name == segment))
            });
            current = match existing {
                Some(child) => child,
                None => self.scene.add_node(Some(current), segment, None),
            };
        }
        current
    }

    /// Attach a component at `path`
    pub fn component(mut self, path: &str, component: AudioComponent) -> Self {
        let key = self.ensure_path(path);
        if let Some(node) = self.scene.node_mut(key) {
            node.component = Some(component);
        }
        self
    }

    /// Attach a layered object at `path`
    pub fn multi_layer(self, path: &str, object_name: &str, clips: &[&str]) -> Self {
        self.component(path, AudioComponent::MultiLayer(layered(object_name, clips)))
    }

    /// Attach a fully configured layered object at `path`
    pub fn layered_audio(self, path: &str, audio: LayeredAudio) -> Self {
        self.component(path, AudioComponent::MultiLayer(audio))
    }

    /// Attach a clip set at `path`
    pub fn clip_set(self, path: &str, object_name: &str, clips: &[&str]) -> Self {
        self.component(path, AudioComponent::ClipSet(clip_set(object_name, clips)))
    }

    /// Mark `path` as the root of a steam chuff sub-structure
    pub fn chuff_controller(self, path: &str) -> Self {
        self.component(path, AudioComponent::ChuffController)
    }

    /// Register the prefab for `vehicle_type` and return its root
    pub fn finish(self, vehicle_type: VehicleType) -> NodeKey {
        self.scene.register_prefab(vehicle_type, self.root);
        self.root
    }
}
