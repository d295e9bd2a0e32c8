//! Restorator
//!
//! Reverts live audio objects to their vanilla state. The captured snapshot
//! is the primary source; without one the clips are re-derived from the
//! vehicle type's prefab, which is never modified by this crate.

use crate::catalog::SoundKey;
use crate::discovery::Discovery;
use crate::error::{BatchReport, SoundError};
use crate::scene::{AudioComponent, AudioScene, InstanceKey};
use crate::vanilla::VanillaCache;

/// How a restore request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Key unsupported on this vehicle, or the object is not resolvable yet
    Unsupported,
    /// Full state written back from the vanilla snapshot
    FromSnapshot,
    /// Clips re-derived from the prefab; pitch and curves were not restored
    FromPrefab,
}

/// Reverts overrides on live audio objects
pub struct Restorator<'a> {
    discovery: &'a mut Discovery,
    vanilla: &'a VanillaCache,
}

impl<'a> Restorator<'a> {
    /// Borrow the caches for one or more restores
    pub fn new(discovery: &'a mut Discovery, vanilla: &'a VanillaCache) -> Self {
        Self { discovery, vanilla }
    }

    /// Revert one key on one vehicle
    pub fn restore_role(
        &mut self,
        scene: &mut AudioScene,
        instance: InstanceKey,
        key: &SoundKey,
    ) -> Result<RestoreOutcome, SoundError> {
        let node = match self.discovery.resolve(scene, instance, key) {
            Ok(node) => node,
            Err(e) if e.is_not_found() => {
                log::debug!("Nothing to restore: {}", e);
                return Ok(RestoreOutcome::Unsupported);
            }
            Err(e) => return Err(e),
        };

        // prefab component is cloned up front so the live object can be borrowed mutably
        let fallback = if self.vanilla.contains(instance, key) {
            None
        } else {
            let vehicle_type = scene
                .instance(instance)
                .map(|v| v.vehicle_type.clone())
                .ok_or(SoundError::UnknownInstance)?;
            self.discovery
                .resolve_in_prefab(scene, &vehicle_type, key)
                .and_then(|prefab| scene.component(prefab).cloned())
        };

        let component = scene
            .component_mut(node)
            .ok_or_else(|| SoundError::StaleHandle(key.clone()))?;
        component.stop();

        let outcome = if self.vanilla.restore(instance, key, component) {
            RestoreOutcome::FromSnapshot
        } else {
            let Some(prefab) = fallback else {
                component.reset();
                return Err(SoundError::MissingSnapshot(key.clone()));
            };
            if !restore_from_prefab(component, &prefab) {
                component.reset();
                return Err(SoundError::MissingSnapshot(key.clone()));
            }
            log::warn!(
                "No vanilla snapshot for {}; clips restored from prefab, pitch and curves not guaranteed",
                key
            );
            RestoreOutcome::FromPrefab
        };

        component.reset();
        log::debug!("Restored {} ({:?})", key, outcome);
        Ok(outcome)
    }

    /// Revert every key the vehicle's type supports
    ///
    /// Each key is isolated: failures are collected, never short-circuited.
    pub fn restore_all(&mut self, scene: &mut AudioScene, instance: InstanceKey) -> Result<BatchReport, SoundError> {
        if scene.instance(instance).is_none() {
            return Err(SoundError::UnknownInstance);
        }
        let keys = self
            .discovery
            .mapping_for(scene, instance)
            .map(|m| m.keys())
            .unwrap_or_default();

        let mut report = BatchReport::new();
        for key in keys {
            match self.restore_role(scene, instance, &key) {
                Ok(RestoreOutcome::Unsupported) => report.record_skip(),
                Ok(_) => report.record_success(),
                Err(e) => {
                    log::warn!("Failed to restore {}: {}", key, e);
                    report.record_failure(key.to_string(), e);
                }
            }
        }
        Ok(report)
    }
}

/// Copy the construction-time clips (and layer mute flags) of `prefab`
fn restore_from_prefab(component: &mut AudioComponent, prefab: &AudioComponent) -> bool {
    match (component, prefab) {
        (AudioComponent::MultiLayer(live), AudioComponent::MultiLayer(original)) => {
            for (layer, source) in live.layers.iter_mut().zip(&original.layers) {
                layer.source.clip = source.source.clip.clone();
                layer.source.mute = source.source.mute;
            }
            true
        }
        (AudioComponent::ClipSet(live), AudioComponent::ClipSet(original)) => {
            live.clips = original.clips.clone();
            true
        }
        _ => false,
    }
}
