//! Audio scene graph
//!
//! Arena of audio nodes and vehicle instances. Keys are generational, so a
//! key held after its node (or vehicle) was destroyed simply stops
//! resolving; that is how stale cache entries are detected.

use std::collections::{HashMap, HashSet};

use slotmap::SlotMap;

use super::node::{AudioComponent, SceneNode};
use super::{InstanceKey, NodeKey};
use crate::catalog::VehicleType;

/// Live vehicle instance
#[derive(Debug, Clone)]
pub struct VehicleInstance {
    /// Externally assigned human-readable identifier (e.g. "L-042")
    pub identifier: String,
    /// Vehicle class
    pub vehicle_type: VehicleType,
    /// Entry point into the instance's audio graph; `None` until the host
    /// has finished building it
    pub audio_root: Option<NodeKey>,
}

/// One node reached by [`AudioScene::walk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// Node reached
    pub key: NodeKey,
    /// Distance from the walk's entry point
    pub depth: usize,
}

/// Arena owning every audio node, prefab and vehicle instance
#[derive(Debug, Default)]
pub struct AudioScene {
    nodes: SlotMap<NodeKey, SceneNode>,
    instances: SlotMap<InstanceKey, VehicleInstance>,
    prefabs: HashMap<VehicleType, NodeKey>,
}

impl AudioScene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, appending it to `parent`'s children
    ///
    /// An invalid parent key creates a detached root.
    pub fn add_node(
        &mut self,
        parent: Option<NodeKey>,
        name: impl Into<String>,
        component: Option<AudioComponent>,
    ) -> NodeKey {
        let parent = parent.filter(|p| self.nodes.contains_key(*p));
        let key = self.nodes.insert(SceneNode {
            name: name.into(),
            parent,
            children: Vec::new(),
            component,
        });
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent_node.children.push(key);
        }
        key
    }

    /// Node by key
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Node by key, mutably
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Audio component of a node
    pub fn component(&self, key: NodeKey) -> Option<&AudioComponent> {
        self.nodes.get(key)?.component.as_ref()
    }

    /// Audio component of a node, mutably
    pub fn component_mut(&mut self, key: NodeKey) -> Option<&mut AudioComponent> {
        self.nodes.get_mut(key)?.component.as_mut()
    }

    /// Whether `key` still refers to a live node
    pub fn contains_node(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Total number of live nodes (prefabs included)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Destroy a node and everything below it, returning the number removed
    pub fn remove_subtree(&mut self, key: NodeKey) -> usize {
        let Some(parent) = self.nodes.get(key).map(|n| n.parent) else {
            return 0;
        };
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent_node.children.retain(|c| *c != key);
        }

        let mut removed = 0;
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                removed += 1;
                stack.extend(node.children);
            }
        }
        removed
    }

    /// Slash-separated path of `key` relative to `root` (empty for the root itself)
    ///
    /// Returns `None` when `key` does not sit below `root`.
    pub fn path_from(&self, root: NodeKey, key: NodeKey) -> Option<String> {
        let mut names = Vec::new();
        let mut current = key;
        let mut guard = 0usize;
        while current != root {
            let node = self.nodes.get(current)?;
            names.push(node.name.as_str());
            current = node.parent?;
            guard += 1;
            if guard > self.nodes.len() {
                return None;
            }
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Depth-first walk from `root`, visiting each node at most once
    ///
    /// Nodes deeper than `max_depth` are not visited. The subtree of a chuff
    /// controller is only entered when `enter_chuff` is set; the controller
    /// itself is always reported.
    pub fn walk(&self, root: NodeKey, max_depth: usize, enter_chuff: bool) -> Vec<Visit> {
        let mut visits = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![Visit { key: root, depth: 0 }];

        while let Some(visit) = stack.pop() {
            if !seen.insert(visit.key) {
                continue;
            }
            let Some(node) = self.nodes.get(visit.key) else {
                continue;
            };
            visits.push(visit);

            if visit.depth >= max_depth || (node.is_chuff_controller() && !enter_chuff) {
                continue;
            }
            // reversed so children come out in insertion order
            for child in node.children.iter().rev() {
                stack.push(Visit {
                    key: *child,
                    depth: visit.depth + 1,
                });
            }
        }
        visits
    }

    /// Deep-copy the subtree under `source`, attaching the copy to `parent`
    pub fn clone_subtree(&mut self, source: NodeKey, parent: Option<NodeKey>) -> Option<NodeKey> {
        if !self.nodes.contains_key(source) {
            return None;
        }

        let mut new_root = None;
        let mut seen = HashSet::new();
        let mut stack = vec![(source, parent)];
        while let Some((src, new_parent)) = stack.pop() {
            if !seen.insert(src) {
                continue;
            }
            let Some(node) = self.nodes.get(src) else {
                continue;
            };
            let name = node.name.clone();
            let component = node.component.clone();
            let children = node.children.clone();

            let copy = self.add_node(new_parent, name, component);
            new_root.get_or_insert(copy);
            for child in children.into_iter().rev() {
                stack.push((child, Some(copy)));
            }
        }
        new_root
    }

    /// Register the pristine audio graph a vehicle type is built from
    pub fn register_prefab(&mut self, vehicle_type: VehicleType, root: NodeKey) {
        if let Some(previous) = self.prefabs.insert(vehicle_type.clone(), root) {
            if previous != root {
                log::warn!("Replacing prefab audio graph for {}", vehicle_type);
            }
        }
    }

    /// Root of a vehicle type's prefab audio graph
    pub fn prefab_root(&self, vehicle_type: &VehicleType) -> Option<NodeKey> {
        self.prefabs
            .get(vehicle_type)
            .copied()
            .filter(|k| self.nodes.contains_key(*k))
    }

    /// Vehicle types with a registered prefab
    pub fn prefab_types(&self) -> impl Iterator<Item = &VehicleType> {
        self.prefabs.keys()
    }

    /// Spawn a vehicle whose audio graph has not been built yet
    pub fn spawn_instance(
        &mut self,
        identifier: impl Into<String>,
        vehicle_type: VehicleType,
    ) -> InstanceKey {
        self.instances.insert(VehicleInstance {
            identifier: identifier.into(),
            vehicle_type,
            audio_root: None,
        })
    }

    /// Build an instance's audio graph by copying its type's prefab
    pub fn instantiate_audio(&mut self, instance: InstanceKey) -> Option<NodeKey> {
        let vehicle_type = self.instances.get(instance)?.vehicle_type.clone();
        let prefab = self.prefab_root(&vehicle_type)?;
        let root = self.clone_subtree(prefab, None)?;
        self.attach_audio(instance, root);
        Some(root)
    }

    /// Attach an already built audio graph to an instance
    pub fn attach_audio(&mut self, instance: InstanceKey, root: NodeKey) -> bool {
        match self.instances.get_mut(instance) {
            Some(vehicle) => {
                vehicle.audio_root = Some(root);
                true
            }
            None => false,
        }
    }

    /// Destroy a vehicle and its audio graph
    pub fn destroy_instance(&mut self, instance: InstanceKey) -> bool {
        let Some(vehicle) = self.instances.remove(instance) else {
            return false;
        };
        if let Some(root) = vehicle.audio_root {
            self.remove_subtree(root);
        }
        true
    }

    /// Vehicle by key
    pub fn instance(&self, instance: InstanceKey) -> Option<&VehicleInstance> {
        self.instances.get(instance)
    }

    /// Audio entry point of a vehicle, if it has been built and is still alive
    pub fn audio_root(&self, instance: InstanceKey) -> Option<NodeKey> {
        self.instances
            .get(instance)?
            .audio_root
            .filter(|k| self.nodes.contains_key(*k))
    }

    /// Find a vehicle by its human-readable identifier
    pub fn find_instance(&self, identifier: &str) -> Option<InstanceKey> {
        self.instances
            .iter()
            .find(|(_, v)| v.identifier == identifier)
            .map(|(k, _)| k)
    }

    /// Every live vehicle
    pub fn instances(&self) -> impl Iterator<Item = (InstanceKey, &VehicleInstance)> {
        self.instances.iter()
    }
}
