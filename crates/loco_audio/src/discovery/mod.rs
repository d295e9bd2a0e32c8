//! Discovery service
//!
//! Maps sound roles to the audio objects that realize them.
//!
//! Two levels of caching are involved:
//! - a [`RoleMapping`] per vehicle type, built once by scanning the type's
//!   prefab graph (role -> durable identifier + hierarchy path);
//! - a resolved [`NodeKey`] per (vehicle instance, key), because finding the
//!   live object again by name stops working once its clip was swapped.
//!
//! Resolution never panics and never treats absence as fatal: an
//! unsupported role, an unscanned type or a half-built instance all come
//! back as [`SoundError::NotFound`].

pub mod chuff;
pub mod rules;

use std::collections::{BTreeMap, HashMap};

use crate::catalog::{Role, Shape, SoundKey, VehicleType};
use crate::config::DiscoveryConfig;
use crate::error::SoundError;
use crate::scene::{AudioComponent, AudioScene, InstanceKey, NodeKey, SceneNode};

use self::rules::RuleSet;

/// Where a role lives on a vehicle type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedNode {
    /// Durable identifier: the object name, or its first clip name when the
    /// object name is a placeholder
    pub identifier: String,
    /// Name of the node carrying the object
    pub node_name: String,
    /// Slash-separated path below the audio entry point
    pub path: String,
    /// Shape of the object
    pub shape: Shape,
}

/// Role -> object table for one vehicle type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMapping {
    roles: BTreeMap<Role, MappedNode>,
    generic: BTreeMap<String, MappedNode>,
}

impl RoleMapping {
    /// Entry for a key
    pub fn get(&self, key: &SoundKey) -> Option<&MappedNode> {
        match key {
            SoundKey::Role(role) => self.roles.get(role),
            SoundKey::Generic(name) => self.generic.get(name),
        }
    }

    /// Whether the key is realized on this vehicle type
    pub fn supports(&self, key: &SoundKey) -> bool {
        self.get(key).is_some()
    }

    /// Roles realized on this vehicle type
    pub fn roles(&self) -> impl Iterator<Item = (&Role, &MappedNode)> {
        self.roles.iter()
    }

    /// Generic sounds, keyed by clip name
    pub fn generic(&self) -> impl Iterator<Item = (&String, &MappedNode)> {
        self.generic.iter()
    }

    /// Every key this mapping can resolve, roles first
    pub fn keys(&self) -> Vec<SoundKey> {
        self.roles
            .keys()
            .map(|r| SoundKey::Role(*r))
            .chain(self.generic.keys().map(|n| SoundKey::Generic(n.clone())))
            .collect()
    }

    /// Whether nothing was discovered
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.generic.is_empty()
    }
}

/// Discovery service: type-level scans plus per-instance handle cache
#[derive(Debug)]
pub struct Discovery {
    config: DiscoveryConfig,
    rules: RuleSet,
    mappings: HashMap<VehicleType, RoleMapping>,
    handles: HashMap<InstanceKey, HashMap<SoundKey, NodeKey>>,
}

impl Discovery {
    /// Create a discovery service
    pub fn new(config: DiscoveryConfig) -> Self {
        let rules = RuleSet::with_extra(&config.extra_rules);
        Self {
            config,
            rules,
            mappings: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    /// Drop every mapping and resolved handle (full rescan follows lazily)
    pub fn clear(&mut self) {
        self.mappings.clear();
        self.handles.clear();
    }

    /// Forget the resolved handles of one vehicle
    pub fn forget_instance(&mut self, instance: InstanceKey) {
        self.handles.remove(&instance);
    }

    /// Keep only the handles of vehicles for which `alive` holds
    pub fn retain_instances(&mut self, mut alive: impl FnMut(InstanceKey) -> bool) {
        self.handles.retain(|k, _| alive(*k));
    }

    /// Mapping of a type, if it has been scanned
    pub fn mapping(&self, vehicle_type: &VehicleType) -> Option<&RoleMapping> {
        self.mappings.get(vehicle_type)
    }

    /// Number of vehicle types with a mapping
    pub fn mapped_types(&self) -> usize {
        self.mappings.len()
    }

    /// Cached handle for (instance, key), without validating it
    pub fn cached_handle(&self, instance: InstanceKey, key: &SoundKey) -> Option<NodeKey> {
        self.handles.get(&instance)?.get(key).copied()
    }

    /// Scan a vehicle type's prefab and cache its mapping
    ///
    /// A scan that finds nothing is not cached, so the next access retries.
    pub fn scan_type(&mut self, scene: &AudioScene, vehicle_type: &VehicleType) -> Option<&RoleMapping> {
        let Some(root) = scene.prefab_root(vehicle_type) else {
            log::debug!("No prefab registered for {}", vehicle_type);
            return None;
        };
        let mapping = self.scan_graph(scene, root);
        self.store_mapping(vehicle_type, mapping)
    }

    /// Scan every registered prefab from scratch; returns the number of mapped types
    ///
    /// Mappings of types without a prefab were built from a live instance
    /// before it was overridden and are kept: a rescan of that instance
    /// would only see the override's clip names.
    pub fn rescan_all(&mut self, scene: &AudioScene) -> usize {
        self.handles.clear();
        self.mappings.retain(|t, _| scene.prefab_root(t).is_none());
        let types: Vec<VehicleType> = scene.prefab_types().cloned().collect();
        for vehicle_type in &types {
            self.scan_type(scene, vehicle_type);
        }
        log::info!(
            "Discovery mapped {} of {} vehicle type(s)",
            self.mappings.len(),
            types.len()
        );
        self.mappings.len()
    }

    /// Build a mapping for the graph below `root` without caching it
    pub fn scan_graph(&self, scene: &AudioScene, root: NodeKey) -> RoleMapping {
        let mut mapping = RoleMapping::default();
        let mut controllers = Vec::new();

        for visit in scene.walk(root, self.config.max_depth, false) {
            let Some(node) = scene.node(visit.key) else {
                continue;
            };
            if node.is_chuff_controller() {
                controllers.push(visit.key);
                continue;
            }
            let Some(component) = node.component.as_ref() else {
                continue;
            };
            let Some(shape) = component.shape() else {
                continue;
            };

            let path = scene.path_from(root, visit.key).unwrap_or_default();
            let identifier = self.durable_identifier(node, component);
            let clip_names = component.clip_names();
            let inferred = self.rules.infer(
                shape,
                [identifier.as_str(), node.name.as_str(), path.as_str()]
                    .into_iter()
                    .chain(clip_names.iter().copied()),
            );
            let mapped = MappedNode {
                identifier,
                node_name: node.name.clone(),
                path,
                shape,
            };

            match inferred {
                Some(role) if !mapping.roles.contains_key(&role) => {
                    log::debug!("{} -> {} ({})", role, mapped.path, mapped.identifier);
                    mapping.roles.insert(role, mapped);
                }
                Some(role) => {
                    log::debug!("{} already mapped, keeping {} as generic", role, mapped.path);
                    self.record_generic(&mut mapping, component, mapped);
                }
                None => self.record_generic(&mut mapping, component, mapped),
            }
        }

        if !controllers.is_empty() {
            let candidates = chuff::band_candidates(scene, &controllers, self.config.max_depth);
            for (role, key) in chuff::match_bands(scene, &candidates) {
                let (Some(node), Some(component)) = (scene.node(key), scene.component(key)) else {
                    continue;
                };
                mapping.roles.insert(
                    role,
                    MappedNode {
                        identifier: self.durable_identifier(node, component),
                        node_name: node.name.clone(),
                        path: scene.path_from(root, key).unwrap_or_default(),
                        shape: Shape::MultiLayer,
                    },
                );
            }
        }

        mapping
    }

    /// Resolve the live object for (instance, key)
    ///
    /// A cached handle is reused while it still points at a live object of
    /// the expected shape; a stale one is evicted and resolution runs again
    /// from the type mapping.
    pub fn resolve(
        &mut self,
        scene: &AudioScene,
        instance: InstanceKey,
        key: &SoundKey,
    ) -> Result<NodeKey, SoundError> {
        if let Some(cached) = self.cached_handle(instance, key) {
            if self.handle_is_live(scene, instance, key, cached) {
                return Ok(cached);
            }
            log::debug!("Evicting stale handle for {}", key);
            if let Some(per_instance) = self.handles.get_mut(&instance) {
                per_instance.remove(key);
            }
        }

        let vehicle_type = scene
            .instance(instance)
            .ok_or(SoundError::UnknownInstance)?
            .vehicle_type
            .clone();
        let mapping = self
            .mapping_for(scene, instance)
            .ok_or_else(|| SoundError::not_found(key, format!("{vehicle_type} has not been scanned")))?;
        let mapped = mapping
            .get(key)
            .cloned()
            .ok_or_else(|| SoundError::not_found(key, format!("unsupported on {vehicle_type}")))?;

        let root = scene
            .audio_root(instance)
            .ok_or_else(|| SoundError::not_found(key, "audio graph not constructed yet"))?;
        let node = self
            .locate(scene, root, &mapped)
            .ok_or_else(|| SoundError::not_found(key, format!("no live object matches '{}'", mapped.identifier)))?;

        self.handles
            .entry(instance)
            .or_default()
            .insert(key.clone(), node);
        Ok(node)
    }

    /// Mapping of an instance's vehicle type, scanning it on first use
    pub fn mapping_for(&mut self, scene: &AudioScene, instance: InstanceKey) -> Option<&RoleMapping> {
        let vehicle_type = scene.instance(instance)?.vehicle_type.clone();
        if !self.mappings.contains_key(&vehicle_type) {
            self.scan_for_instance(scene, instance, &vehicle_type);
        }
        self.mappings.get(&vehicle_type)
    }

    /// Locate the object for `key` in a vehicle type's pristine prefab
    pub fn resolve_in_prefab(
        &mut self,
        scene: &AudioScene,
        vehicle_type: &VehicleType,
        key: &SoundKey,
    ) -> Option<NodeKey> {
        let root = scene.prefab_root(vehicle_type)?;
        if !self.mappings.contains_key(vehicle_type) {
            self.scan_type(scene, vehicle_type);
        }
        let mapped = self.mappings.get(vehicle_type)?.get(key)?.clone();
        self.locate(scene, root, &mapped)
    }

    fn scan_for_instance(&mut self, scene: &AudioScene, instance: InstanceKey, vehicle_type: &VehicleType) {
        if scene.prefab_root(vehicle_type).is_some() {
            self.scan_type(scene, vehicle_type);
            return;
        }
        // Externally registered types may come without a prefab; the first
        // live instance is scanned instead, before anything was overridden.
        if let Some(root) = scene.audio_root(instance) {
            log::debug!("Scanning live instance graph for {}", vehicle_type);
            let mapping = self.scan_graph(scene, root);
            self.store_mapping(vehicle_type, mapping);
        }
    }

    fn store_mapping(&mut self, vehicle_type: &VehicleType, mapping: RoleMapping) -> Option<&RoleMapping> {
        if mapping.is_empty() {
            log::debug!("Scan of {} found no audio objects", vehicle_type);
            return None;
        }
        log::debug!(
            "Mapped {} role(s) and {} generic sound(s) on {}",
            mapping.roles.len(),
            mapping.generic.len(),
            vehicle_type
        );
        // whole-value insert: readers never see a half-built mapping
        self.mappings.insert(vehicle_type.clone(), mapping);
        self.mappings.get(vehicle_type)
    }

    fn durable_identifier(&self, node: &SceneNode, component: &AudioComponent) -> String {
        let name = component.name().unwrap_or_default();
        if !self.config.is_placeholder(name) {
            return name.to_string();
        }
        component
            .clip_names()
            .first()
            .map_or_else(|| node.name.clone(), |clip| (*clip).to_string())
    }

    fn record_generic(&self, mapping: &mut RoleMapping, component: &AudioComponent, mapped: MappedNode) {
        if !self.config.record_generic {
            return;
        }
        let key = component
            .clip_names()
            .first()
            .map_or_else(|| mapped.identifier.clone(), |clip| (*clip).to_string());
        if mapping.generic.contains_key(&key) {
            log::debug!("Generic sound '{}' already recorded, skipping {}", key, mapped.path);
            return;
        }
        mapping.generic.insert(key, mapped);
    }

    fn handle_is_live(&self, scene: &AudioScene, instance: InstanceKey, key: &SoundKey, node: NodeKey) -> bool {
        let Some(root) = scene.audio_root(instance) else {
            return false;
        };
        let Some(shape) = scene.node(node).and_then(SceneNode::shape) else {
            return false;
        };
        let expected = scene
            .instance(instance)
            .and_then(|v| self.mappings.get(&v.vehicle_type))
            .and_then(|m| m.get(key))
            .map_or(shape, |m| m.shape);
        shape == expected && scene.path_from(root, node).is_some()
    }

    /// Find the live object matching a mapped entry below `root`
    ///
    /// Matching tiers, best first: object identifier, node name, current
    /// clip name. Within a tier a candidate on the recorded path wins.
    fn locate(&self, scene: &AudioScene, root: NodeKey, mapped: &MappedNode) -> Option<NodeKey> {
        let mut best: Option<((u8, bool), NodeKey)> = None;

        for visit in scene.walk(root, self.config.max_depth, true) {
            let Some(node) = scene.node(visit.key) else {
                continue;
            };
            let Some(component) = node.component.as_ref() else {
                continue;
            };
            if component.shape() != Some(mapped.shape) {
                continue;
            }

            let tier = if component.name() == Some(mapped.identifier.as_str()) {
                0
            } else if node.name == mapped.identifier || node.name == mapped.node_name {
                1
            } else if component.clip_names().contains(&mapped.identifier.as_str()) {
                2
            } else {
                continue;
            };
            let off_path = scene.path_from(root, visit.key).as_deref() != Some(mapped.path.as_str());
            let rank = (tier, off_path);
            if best.map_or(true, |(current, _)| rank < current) {
                best = Some((rank, visit.key));
            }
        }

        best.map(|(_, key)| key)
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}
