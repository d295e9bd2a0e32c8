//! Sound override engine
//!
//! [`SoundEngine`] is the long-lived context owning every cache. The host
//! keeps ownership of the [`AudioScene`] and passes it into each call.

use std::path::PathBuf;

use crate::applicator::Applicator;
use crate::catalog::SoundKey;
use crate::config::SoundConfig;
use crate::discovery::Discovery;
use crate::error::{BatchReport, SoundError};
use crate::events::{EventQueue, HostEvent};
use crate::overrides::{OverrideDefinition, OverrideSet, SoundCatalog};
use crate::registry::Registry;
use crate::restorator::{RestoreOutcome, Restorator};
use crate::scene::{AudioScene, ClipLoader, FsClipLoader, InstanceKey, NodeKey};
use crate::vanilla::VanillaCache;

/// Result of [`SoundEngine::set_override`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideStatus {
    /// Applied to the live object
    Applied(NodeKey),
    /// Recorded; applied once the vehicle's audio graph exists
    Deferred,
}

/// Discovery, override and restore engine
pub struct SoundEngine {
    config: SoundConfig,
    discovery: Discovery,
    vanilla: VanillaCache,
    registry: Registry,
    catalog: SoundCatalog,
    loader: Box<dyn ClipLoader>,
    events: EventQueue,
}

impl SoundEngine {
    /// Create an engine loading clips from disk
    pub fn new(config: SoundConfig) -> Self {
        Self::with_loader(config, Box::new(FsClipLoader::new()))
    }

    /// Create an engine with a custom clip loader
    pub fn with_loader(config: SoundConfig, loader: Box<dyn ClipLoader>) -> Self {
        Self {
            discovery: Discovery::new(config.discovery.clone()),
            vanilla: VanillaCache::new(),
            registry: Registry::new(&config.registry),
            catalog: SoundCatalog::new(),
            loader,
            events: EventQueue::new(),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    /// Discovery service
    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Discovery service, mutably
    pub fn discovery_mut(&mut self) -> &mut Discovery {
        &mut self.discovery
    }

    /// Vanilla cache
    pub fn vanilla(&self) -> &VanillaCache {
        &self.vanilla
    }

    /// Registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registry, mutably
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Sound catalog
    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    /// Sound catalog, mutably
    pub fn catalog_mut(&mut self) -> &mut SoundCatalog {
        &mut self.catalog
    }

    /// Host event queue
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Apply (or, with `None`, only capture) one key without recording it
    pub fn apply(
        &mut self,
        scene: &mut AudioScene,
        instance: InstanceKey,
        key: &SoundKey,
        definition: Option<&OverrideDefinition>,
    ) -> Result<NodeKey, SoundError> {
        Applicator::new(&mut self.discovery, &mut self.vanilla, self.loader.as_mut()).apply(
            scene,
            instance,
            key,
            definition,
        )
    }

    /// Revert one key without touching the override set
    pub fn restore_role(
        &mut self,
        scene: &mut AudioScene,
        instance: InstanceKey,
        key: &SoundKey,
    ) -> Result<RestoreOutcome, SoundError> {
        Restorator::new(&mut self.discovery, &self.vanilla).restore_role(scene, instance, key)
    }

    /// Revert every key without touching the override set
    pub fn restore_all(&mut self, scene: &mut AudioScene, instance: InstanceKey) -> Result<BatchReport, SoundError> {
        Restorator::new(&mut self.discovery, &self.vanilla).restore_all(scene, instance)
    }

    /// Select an override for a vehicle: apply it, record it, persist it
    ///
    /// A key the vehicle type does not support is refused with
    /// [`SoundError::NotFound`]. A supported key whose object is not built
    /// yet is recorded and applied later.
    pub fn set_override(
        &mut self,
        scene: &mut AudioScene,
        instance: InstanceKey,
        definition: OverrideDefinition,
    ) -> Result<OverrideStatus, SoundError> {
        let key = definition.key.clone();
        let supported = self
            .discovery
            .mapping_for(scene, instance)
            .is_some_and(|m| m.supports(&key));
        if !supported {
            return Err(SoundError::not_found(&key, "unsupported on this vehicle"));
        }

        let status = match self.apply(scene, instance, &key, Some(&definition)) {
            Ok(node) => {
                self.registry.cancel_pending(instance, &key);
                OverrideStatus::Applied(node)
            }
            Err(e) if e.is_not_found() => {
                log::debug!("Deferring '{}': {}", definition.name, e);
                self.registry.defer(instance, definition.clone());
                OverrideStatus::Deferred
            }
            Err(e) => {
                log::warn!("Override '{}' rejected: {}", definition.name, e);
                return Err(e);
            }
        };

        log::info!("Override '{}' selected for {}", definition.name, key);
        self.registry.mark_customized(instance);
        self.registry.get_mut(instance).insert(definition);
        self.registry.save_current(scene, instance)?;
        Ok(status)
    }

    /// Drop the override for one key: restore, forget, persist
    pub fn clear_override(
        &mut self,
        scene: &mut AudioScene,
        instance: InstanceKey,
        key: &SoundKey,
    ) -> Result<RestoreOutcome, SoundError> {
        let outcome = self.restore_role(scene, instance, key)?;
        self.registry.cancel_pending(instance, key);
        if self.registry.get_mut(instance).remove(key).is_some() {
            log::info!("Override cleared for {}", key);
        }
        self.registry.save_current(scene, instance)?;
        Ok(outcome)
    }

    /// Revert every override of a vehicle and forget them
    pub fn reset_instance(&mut self, scene: &mut AudioScene, instance: InstanceKey) -> Result<BatchReport, SoundError> {
        let report = self.restore_all(scene, instance)?;
        let mut keys: Vec<SoundKey> = self.registry.get(instance).keys().cloned().collect();
        if let Some(unresolved) = self.registry.unresolved(instance) {
            keys.extend(unresolved.keys().cloned());
        }
        for key in &keys {
            self.registry.cancel_pending(instance, key);
        }
        self.registry.save(scene, instance, OverrideSet::new())?;
        log::info!("Vehicle reset, {} override(s) dropped", keys.len());
        Ok(report)
    }

    /// World finished loading: rescan, reload the catalog, replay saved overrides
    pub fn on_world_loaded(&mut self, scene: &mut AudioScene) -> BatchReport {
        self.prune(scene);
        self.discovery.rescan_all(scene);

        let mut report = BatchReport::new();
        if let Some(dir) = self.config.sound_dir.clone() {
            report.merge(self.reload_catalog(dir));
        }

        self.registry.load_all();
        let mut applicator = Applicator::new(&mut self.discovery, &mut self.vanilla, self.loader.as_mut());
        report.merge(self.registry.apply_saved(scene, &mut applicator, &self.catalog));
        log::info!(
            "World loaded: {} override(s) applied, {} skipped, {} failed",
            report.succeeded,
            report.skipped,
            report.failures.len()
        );
        report
    }

    /// A vehicle appeared after the world was loaded
    ///
    /// Its saved overrides are queued and applied as soon as its audio graph
    /// can be resolved.
    pub fn on_vehicle_spawned(&mut self, scene: &mut AudioScene, instance: InstanceKey) -> BatchReport {
        let mut report = BatchReport::new();
        let Some(vehicle) = scene.instance(instance) else {
            return report;
        };
        let Some(entry) = self.registry.saved_entry(&vehicle.identifier).cloned() else {
            return report;
        };
        if entry.vehicle_type != vehicle.vehicle_type {
            log::warn!(
                "Vehicle {} is a {} but its overrides were saved for a {}; skipping",
                entry.identifier,
                vehicle.vehicle_type,
                entry.vehicle_type
            );
            report.record_skip();
            return report;
        }

        for (key, name) in &entry.overrides {
            match self.catalog.get(key, name) {
                Some(definition) => {
                    self.registry.get_mut(instance).insert(definition.clone());
                    self.registry.defer(instance, definition.clone());
                }
                None => {
                    self.registry.keep_unresolved(instance, key.clone(), name.clone());
                    report.record_failure(
                        format!("{}/{}", entry.identifier, key),
                        SoundError::configuration(name, format!("override not found in catalog for {key}")),
                    );
                }
            }
        }
        self.registry.mark_customized(instance);
        report.merge(self.on_parameter_read(scene, instance));
        report
    }

    /// The host is reading a vehicle's audio parameters: retry pending overrides
    pub fn on_parameter_read(&mut self, scene: &mut AudioScene, instance: InstanceKey) -> BatchReport {
        let mut applicator = Applicator::new(&mut self.discovery, &mut self.vanilla, self.loader.as_mut());
        self.registry.retry_pending(scene, instance, &mut applicator)
    }

    /// A vehicle is going away: drop every per-instance cache entry
    pub fn on_vehicle_destroyed(&mut self, instance: InstanceKey) {
        self.discovery.forget_instance(instance);
        let snapshots = self.vanilla.forget_instance(instance);
        self.registry.forget_instance(instance);
        log::debug!("Forgot vehicle ({} snapshot(s))", snapshots);
    }

    /// Queue a host event for the next [`process_events`](Self::process_events)
    pub fn send_event(&mut self, event: HostEvent) {
        self.events.send(event);
    }

    /// Dispatch every due host event
    pub fn process_events(&mut self, scene: &mut AudioScene) -> BatchReport {
        let mut report = BatchReport::new();
        for event in self.events.drain_due() {
            log::debug!("Host event {:?}", event);
            match event {
                HostEvent::WorldLoaded => report.merge(self.on_world_loaded(scene)),
                HostEvent::VehicleSpawned(instance) => report.merge(self.on_vehicle_spawned(scene, instance)),
                HostEvent::VehicleDestroyed(instance) => self.on_vehicle_destroyed(instance),
                HostEvent::AudioParameterRead(instance) => report.merge(self.on_parameter_read(scene, instance)),
            }
        }
        report
    }

    fn reload_catalog(&mut self, dir: PathBuf) -> BatchReport {
        match self.catalog.load_dir(&dir) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Keeping previous sound catalog, {} unreadable: {}", dir.display(), e);
                let mut report = BatchReport::new();
                report.record_failure(dir.display().to_string(), e);
                report
            }
        }
    }

    fn prune(&mut self, scene: &AudioScene) {
        let alive = |k: InstanceKey| scene.instance(k).is_some();
        self.discovery.retain_instances(alive);
        self.vanilla.retain_instances(alive);
        self.registry.retain_instances(alive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Role, VehicleType};
    use crate::scene::{AudioComponent, OpaqueClipLoader, PrefabBuilder};
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> SoundEngine {
        let config = SoundConfig::new().with_registry_path(dir.path().join("registry.json"));
        SoundEngine::with_loader(config, Box::new(OpaqueClipLoader))
    }

    fn world() -> AudioScene {
        let mut scene = AudioScene::new();
        PrefabBuilder::new(&mut scene, "S282 Audio")
            .multi_layer("Whistle", "Clip", &["s282_whistle"])
            .multi_layer("Bell", "Clip", &["s282_bell"])
            .chuff_controller("Chuffs")
            .multi_layer("Chuffs/Chuff_2Hz", "Clip", &["s282_chuff_a"])
            .multi_layer("Chuffs/Chuff_8Hz", "Clip", &["s282_chuff_b"])
            .finish(VehicleType::S282);
        scene
    }

    #[test]
    fn test_set_and_clear_override() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        let mut scene = world();
        let loco = scene.spawn_instance("S-1", VehicleType::S282);
        scene.instantiate_audio(loco);

        let def = OverrideDefinition::new("shrill", Role::Whistle, "shrill.ogg");
        let status = engine.set_override(&mut scene, loco, def).unwrap();
        assert!(matches!(status, OverrideStatus::Applied(_)));
        assert!(engine.registry().saved_entry("S-1").is_some());
        assert!(engine.registry().is_customized(loco));

        let outcome = engine.clear_override(&mut scene, loco, &Role::Whistle.into()).unwrap();
        assert_eq!(outcome, RestoreOutcome::FromSnapshot);
        assert!(engine.registry().saved_entry("S-1").is_none());
    }

    #[test]
    fn test_unsupported_override_is_refused() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        let mut scene = world();
        let loco = scene.spawn_instance("S-1", VehicleType::S282);
        scene.instantiate_audio(loco);

        let def = OverrideDefinition::new("horn", Role::HornLoop, "horn.ogg");
        assert!(engine.set_override(&mut scene, loco, def).unwrap_err().is_not_found());
        assert!(engine.registry().saved_entry("S-1").is_none());
    }

    #[test]
    fn test_chuff_band_override() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        let mut scene = world();
        let loco = scene.spawn_instance("S-1", VehicleType::S282);
        scene.instantiate_audio(loco);

        let def = OverrideDefinition::new("heavy", Role::SteamChuff8Hz, "heavy.ogg");
        let Ok(OverrideStatus::Applied(node)) = engine.set_override(&mut scene, loco, def) else {
            panic!("chuff band should resolve");
        };
        assert_eq!(scene.node(node).map(|n| n.name.as_str()), Some("Chuff_8Hz"));
        assert_eq!(
            scene.component(node).map(AudioComponent::clip_names),
            Some(vec!["heavy"])
        );
    }

    #[test]
    fn test_deferred_until_parameter_read() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        let mut scene = world();
        let loco = scene.spawn_instance("S-1", VehicleType::S282);

        let def = OverrideDefinition::new("ding", Role::Bell, "ding.ogg");
        let status = engine.set_override(&mut scene, loco, def).unwrap();
        assert_eq!(status, OverrideStatus::Deferred);

        scene.instantiate_audio(loco);
        engine.send_event(HostEvent::AudioParameterRead(loco));
        let report = engine.process_events(&mut scene);
        assert_eq!(report.succeeded, 1);
        assert!(engine.registry().pending(loco).is_none());
    }

    #[test]
    fn test_destroy_drops_instance_state() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        let mut scene = world();
        let loco = scene.spawn_instance("S-1", VehicleType::S282);
        scene.instantiate_audio(loco);
        engine
            .set_override(&mut scene, loco, OverrideDefinition::new("d", Role::Bell, "d.ogg"))
            .unwrap();
        assert!(!engine.vanilla().is_empty());

        engine.send_event(HostEvent::VehicleDestroyed(loco));
        engine.process_events(&mut scene);
        scene.destroy_instance(loco);
        assert!(engine.vanilla().is_empty());
        assert!(!engine.registry().is_customized(loco));
        // persisted state survives until the next world load
        assert!(engine.registry().saved_entry("S-1").is_some());
    }

    #[test]
    fn test_reset_instance() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        let mut scene = world();
        let loco = scene.spawn_instance("S-1", VehicleType::S282);
        scene.instantiate_audio(loco);
        let bell = engine.discovery_mut().resolve(&scene, loco, &Role::Bell.into()).unwrap();
        let before = scene.component(bell).cloned();

        engine
            .set_override(&mut scene, loco, OverrideDefinition::new("d", Role::Bell, "d.ogg"))
            .unwrap();
        let report = engine.reset_instance(&mut scene, loco).unwrap();
        assert!(report.is_clean());
        assert_eq!(scene.component(bell).cloned(), before);
        assert!(engine.registry().saved_entry("S-1").is_none());
    }
}
