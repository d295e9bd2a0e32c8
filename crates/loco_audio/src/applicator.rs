//! Applicator
//!
//! The only code path that mutates a live audio object on behalf of an
//! override. Every call captures the vanilla state first, so the first
//! touch of any (instance, key) is always a capture.

use crate::catalog::{Role, SoundKey};
use crate::discovery::Discovery;
use crate::error::SoundError;
use crate::foundation::curve::AnimationCurve;
use crate::overrides::OverrideDefinition;
use crate::scene::{AudioComponent, AudioScene, Clip, ClipLoader, ClipSet, InstanceKey, LayeredAudio, NodeKey};
use crate::vanilla::VanillaCache;

/// Applies override definitions to live audio objects
pub struct Applicator<'a> {
    discovery: &'a mut Discovery,
    vanilla: &'a mut VanillaCache,
    loader: &'a mut dyn ClipLoader,
}

impl<'a> Applicator<'a> {
    /// Borrow the caches and the clip loader for one or more applications
    pub fn new(discovery: &'a mut Discovery, vanilla: &'a mut VanillaCache, loader: &'a mut dyn ClipLoader) -> Self {
        Self {
            discovery,
            vanilla,
            loader,
        }
    }

    /// Apply `definition` to `key` on `instance`
    ///
    /// With no definition the object is only captured. An unsupported key
    /// or an unbuilt graph comes back as [`SoundError::NotFound`] and
    /// nothing is touched; a definition whose files cannot be loaded comes
    /// back as [`SoundError::Configuration`] and the object keeps its
    /// current state.
    pub fn apply(
        &mut self,
        scene: &mut AudioScene,
        instance: InstanceKey,
        key: &SoundKey,
        definition: Option<&OverrideDefinition>,
    ) -> Result<NodeKey, SoundError> {
        let node = self.discovery.resolve(scene, instance, key)?;
        let component = scene
            .component_mut(node)
            .ok_or_else(|| SoundError::StaleHandle(key.clone()))?;

        self.vanilla.capture_if_absent(instance, key, component);

        let Some(definition) = definition else {
            return Ok(node);
        };
        if &definition.key != key {
            log::warn!(
                "Override '{}' was authored for {} but is applied to {}",
                definition.name,
                definition.key,
                key
            );
        }
        definition.validate()?;
        let clips = load_clips(self.loader, definition)?;

        match component {
            AudioComponent::MultiLayer(audio) => apply_layered(audio, key, definition, clips),
            AudioComponent::ClipSet(set) => apply_clip_set(set, definition, clips),
            AudioComponent::ChuffController => {
                return Err(SoundError::not_found(key, "resolved to a chuff controller"));
            }
        }
        log::debug!("Applied override '{}' to {}", definition.name, key);
        Ok(node)
    }
}

fn load_clips(loader: &mut dyn ClipLoader, definition: &OverrideDefinition) -> Result<Vec<Clip>, SoundError> {
    if definition.is_disabled() {
        return Ok(Vec::new());
    }
    definition
        .files
        .iter()
        .map(|file| {
            loader
                .load_clip(file)
                .map_err(|e| SoundError::configuration(&definition.name, e.to_string()))
        })
        .collect()
}

fn apply_layered(audio: &mut LayeredAudio, key: &SoundKey, definition: &OverrideDefinition, clips: Vec<Clip>) {
    if clips.len() > 1 {
        log::debug!(
            "'{}' lists {} files; layered objects use the first",
            definition.name,
            clips.len()
        );
    }

    if definition.min_pitch.is_some() || definition.max_pitch.is_some() {
        audio.min_pitch = definition.min_pitch.unwrap_or(audio.min_pitch);
        audio.max_pitch = definition.max_pitch.unwrap_or(audio.max_pitch);
    }

    if let Some(primary) = audio.primary_mut() {
        if let Some(clip) = clips.into_iter().next() {
            let differs = primary.source.clip.as_ref() != Some(&clip);
            if primary.source.is_playing && (differs || key.is_continuous_loop()) {
                primary.source.stop();
            }
            primary.source.clip = Some(clip);
        }
        if let Some(pitch) = definition.pitch {
            primary.start_pitch = pitch;
        }

        match &definition.pitch_curve {
            Some(curve) => {
                primary.pitch_curve = curve.clone();
                primary.use_pitch_curve = true;
            }
            None if definition.min_pitch.is_some() || definition.max_pitch.is_some() => {
                if let Some(reshaped) = primary.pitch_curve.reshaped(definition.min_pitch, definition.max_pitch) {
                    primary.pitch_curve = reshaped;
                }
            }
            None => {}
        }

        match &definition.volume_curve {
            Some(curve) => {
                primary.volume_curve = curve.clone();
                primary.use_volume_curve = true;
            }
            None if definition.min_volume.is_some() || definition.max_volume.is_some() => {
                primary.volume_curve = primary
                    .volume_curve
                    .reshaped(definition.min_volume, definition.max_volume)
                    .unwrap_or_else(|| {
                        AnimationCurve::ease_in_out(
                            0.0,
                            definition.min_volume.unwrap_or(1.0),
                            1.0,
                            definition.max_volume.unwrap_or(1.0),
                        )
                    });
                primary.use_volume_curve = true;
            }
            None => {}
        }

        if let Some(randomize) = definition.randomize_start_time {
            primary.randomize_start_time = randomize;
        }

        primary.source.mute = definition.is_disabled();
        if definition.is_disabled() {
            primary.source.stop();
        }
    }

    for layer in audio.layers.iter_mut().skip(1) {
        layer.source.mute = true;
        layer.source.stop();
    }

    if key.role() == Some(Role::EngineIdle) {
        audio.stop();
    }
}

fn apply_clip_set(set: &mut ClipSet, definition: &OverrideDefinition, clips: Vec<Clip>) {
    if definition.has_modulation() || definition.randomize_start_time.is_some() {
        log::warn!(
            "Override '{}' sets pitch/volume on clip set '{}'; ignored",
            definition.name,
            set.name
        );
    }
    if set.is_playing && set.clips != clips {
        set.stop();
    }
    set.clips = clips;
    set.reset();
}
