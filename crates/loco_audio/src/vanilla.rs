//! Vanilla cache
//!
//! Per-instance, per-key record of an audio object's state as it was
//! before the first override ever touched it. An entry is written once and
//! never replaced; it lives until the vehicle is destroyed.

use std::collections::HashMap;

use crate::catalog::SoundKey;
use crate::foundation::curve::AnimationCurve;
use crate::scene::{AudioComponent, AudioLayer, Clip, ClipSet, InstanceKey, LayeredAudio};

/// Captured state of one layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSnapshot {
    /// Assigned clip
    pub clip: Option<Clip>,
    /// Start pitch
    pub start_pitch: f32,
    /// Pitch curve (owned copy)
    pub pitch_curve: AnimationCurve,
    /// Volume curve (owned copy)
    pub volume_curve: AnimationCurve,
    /// Whether the pitch curve was in use
    pub use_pitch_curve: bool,
    /// Whether the volume curve was in use
    pub use_volume_curve: bool,
    /// Randomize-start flag
    pub randomize_start_time: bool,
    /// Mute flag
    pub mute: bool,
}

impl LayerSnapshot {
    fn capture(layer: &AudioLayer) -> Self {
        Self {
            clip: layer.source.clip.clone(),
            start_pitch: layer.start_pitch,
            pitch_curve: layer.pitch_curve.clone(),
            volume_curve: layer.volume_curve.clone(),
            use_pitch_curve: layer.use_pitch_curve,
            use_volume_curve: layer.use_volume_curve,
            randomize_start_time: layer.randomize_start_time,
            mute: layer.source.mute,
        }
    }

    fn restore_into(&self, layer: &mut AudioLayer) {
        layer.source.clip = self.clip.clone();
        layer.source.mute = self.mute;
        layer.start_pitch = self.start_pitch;
        layer.pitch_curve = self.pitch_curve.clone();
        layer.volume_curve = self.volume_curve.clone();
        layer.use_pitch_curve = self.use_pitch_curve;
        layer.use_volume_curve = self.use_volume_curve;
        layer.randomize_start_time = self.randomize_start_time;
    }
}

/// Pre-override state of one audio object
#[derive(Debug, Clone, PartialEq)]
pub enum VanillaSnapshot {
    /// Shared pitch range plus every layer
    MultiLayer {
        /// Lower pitch bound
        min_pitch: f32,
        /// Upper pitch bound
        max_pitch: f32,
        /// Layers in order
        layers: Vec<LayerSnapshot>,
    },
    /// Clip array only
    ClipSet {
        /// Clips in order
        clips: Vec<Clip>,
    },
}

impl VanillaSnapshot {
    /// Deep copy of the restorable state of `component`
    ///
    /// Chuff controllers carry no audio and have no snapshot.
    pub fn capture(component: &AudioComponent) -> Option<Self> {
        match component {
            AudioComponent::MultiLayer(audio) => Some(Self::MultiLayer {
                min_pitch: audio.min_pitch,
                max_pitch: audio.max_pitch,
                layers: audio.layers.iter().map(LayerSnapshot::capture).collect(),
            }),
            AudioComponent::ClipSet(set) => Some(Self::ClipSet {
                clips: set.clips.clone(),
            }),
            AudioComponent::ChuffController => None,
        }
    }

    /// Write the snapshot back; returns false on a shape mismatch
    pub fn restore_into(&self, component: &mut AudioComponent) -> bool {
        match (self, component) {
            (
                Self::MultiLayer {
                    min_pitch,
                    max_pitch,
                    layers,
                },
                AudioComponent::MultiLayer(audio),
            ) => {
                restore_layered(audio, *min_pitch, *max_pitch, layers);
                true
            }
            (Self::ClipSet { clips }, AudioComponent::ClipSet(set)) => {
                restore_clip_set(set, clips);
                true
            }
            _ => false,
        }
    }
}

fn restore_layered(audio: &mut LayeredAudio, min_pitch: f32, max_pitch: f32, layers: &[LayerSnapshot]) {
    audio.min_pitch = min_pitch;
    audio.max_pitch = max_pitch;
    if audio.layers.len() != layers.len() {
        log::warn!(
            "Layer count of '{}' changed since capture ({} -> {})",
            audio.name,
            layers.len(),
            audio.layers.len()
        );
    }
    for (layer, snapshot) in audio.layers.iter_mut().zip(layers) {
        snapshot.restore_into(layer);
    }
}

fn restore_clip_set(set: &mut ClipSet, clips: &[Clip]) {
    set.clips = clips.to_vec();
}

/// Snapshots per vehicle instance and key
#[derive(Debug, Default)]
pub struct VanillaCache {
    snapshots: HashMap<InstanceKey, HashMap<SoundKey, VanillaSnapshot>>,
}

impl VanillaCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `component` unless a snapshot for (instance, key) exists
    ///
    /// Returns true when this call created the snapshot.
    pub fn capture_if_absent(&mut self, instance: InstanceKey, key: &SoundKey, component: &AudioComponent) -> bool {
        let per_instance = self.snapshots.entry(instance).or_default();
        if per_instance.contains_key(key) {
            return false;
        }
        let Some(snapshot) = VanillaSnapshot::capture(component) else {
            return false;
        };
        log::debug!("Captured vanilla state of {}", key);
        per_instance.insert(key.clone(), snapshot);
        true
    }

    /// Write the snapshot for (instance, key) back into `component`
    ///
    /// Returns false when nothing was captured or the shapes disagree.
    /// The snapshot itself is kept; restoring twice is harmless.
    pub fn restore(&self, instance: InstanceKey, key: &SoundKey, component: &mut AudioComponent) -> bool {
        match self.get(instance, key) {
            Some(snapshot) => snapshot.restore_into(component),
            None => false,
        }
    }

    /// Snapshot for (instance, key)
    pub fn get(&self, instance: InstanceKey, key: &SoundKey) -> Option<&VanillaSnapshot> {
        self.snapshots.get(&instance)?.get(key)
    }

    /// Whether (instance, key) has a snapshot
    pub fn contains(&self, instance: InstanceKey, key: &SoundKey) -> bool {
        self.get(instance, key).is_some()
    }

    /// Drop every snapshot of a destroyed vehicle
    pub fn forget_instance(&mut self, instance: InstanceKey) -> usize {
        self.snapshots.remove(&instance).map_or(0, |s| s.len())
    }

    /// Keep only the snapshots of vehicles for which `alive` holds
    pub fn retain_instances(&mut self, mut alive: impl FnMut(InstanceKey) -> bool) {
        self.snapshots.retain(|k, _| alive(*k));
    }

    /// Total number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.values().map(HashMap::len).sum()
    }

    /// Whether no snapshot exists
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Role;
    use crate::scene::builder::{clip_set, layered};
    use slotmap::SlotMap;

    fn instance() -> InstanceKey {
        let mut keys: SlotMap<InstanceKey, ()> = SlotMap::with_key();
        keys.insert(())
    }

    #[test]
    fn test_capture_is_idempotent() {
        let loco = instance();
        let key = SoundKey::Role(Role::HornLoop);
        let mut cache = VanillaCache::new();
        let mut component = AudioComponent::MultiLayer(layered("Clip", &["horn", "tail"]));

        assert!(cache.capture_if_absent(loco, &key, &component));
        let first = cache.get(loco, &key).cloned();

        if let AudioComponent::MultiLayer(audio) = &mut component {
            audio.min_pitch = 0.1;
        }
        for _ in 0..3 {
            assert!(!cache.capture_if_absent(loco, &key, &component));
        }
        assert_eq!(cache.get(loco, &key).cloned(), first);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_snapshot_is_deep_copy() {
        let loco = instance();
        let key = SoundKey::Role(Role::EngineLoad);
        let mut cache = VanillaCache::new();
        let mut component = AudioComponent::MultiLayer(layered("Clip", &["load"]));
        let original = component.clone();
        cache.capture_if_absent(loco, &key, &component);

        if let AudioComponent::MultiLayer(audio) = &mut component {
            audio.layers[0].pitch_curve = AnimationCurve::linear(0.0, 0.5, 1.0, 3.0);
            audio.layers[0].source.mute = true;
            audio.layers[0].source.clip = Some(Clip::named("custom"));
        }
        assert!(cache.restore(loco, &key, &mut component));
        assert_eq!(component, original);
    }

    #[test]
    fn test_clip_set_round_trip() {
        let loco = instance();
        let key = SoundKey::Role(Role::HornHit);
        let mut cache = VanillaCache::new();
        let mut component = AudioComponent::ClipSet(clip_set("hits", &["a", "b"]));
        let original = component.clone();
        cache.capture_if_absent(loco, &key, &component);

        if let AudioComponent::ClipSet(set) = &mut component {
            set.clips = vec![Clip::named("c")];
        }
        assert!(cache.restore(loco, &key, &mut component));
        assert_eq!(component, original);
    }

    #[test]
    fn test_restore_without_snapshot() {
        let loco = instance();
        let cache = VanillaCache::new();
        let mut component = AudioComponent::ClipSet(clip_set("hits", &["a"]));
        assert!(!cache.restore(loco, &Role::HornHit.into(), &mut component));
    }

    #[test]
    fn test_shape_mismatch_is_refused() {
        let loco = instance();
        let key = SoundKey::Role(Role::Bell);
        let mut cache = VanillaCache::new();
        cache.capture_if_absent(loco, &key, &AudioComponent::ClipSet(clip_set("bell", &["a"])));
        let mut layered_bell = AudioComponent::MultiLayer(layered("bell", &["b"]));
        assert!(!cache.restore(loco, &key, &mut layered_bell));
    }

    #[test]
    fn test_forget_instance() {
        let loco = instance();
        let mut cache = VanillaCache::new();
        let component = AudioComponent::ClipSet(clip_set("hits", &["a"]));
        cache.capture_if_absent(loco, &Role::HornHit.into(), &component);
        assert_eq!(cache.forget_instance(loco), 1);
        assert!(cache.is_empty());
    }
}
