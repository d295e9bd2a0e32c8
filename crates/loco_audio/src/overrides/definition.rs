//! Override definitions and per-vehicle override sets

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::SoundKey;
use crate::error::SoundError;
use crate::foundation::curve::AnimationCurve;

/// Named, partial replacement for one role's sound
///
/// Every optional field left at `None` inherits the vanilla value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideDefinition {
    /// Name the override is selected and persisted by
    pub name: String,
    /// Role or generic sound this definition targets
    pub key: SoundKey,
    /// Audio files; several files form a round-robin set on clip-set roles
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Absolute start pitch of the primary layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    /// Lower pitch bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pitch: Option<f32>,
    /// Upper pitch bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pitch: Option<f32>,
    /// Volume at the start of the volume curve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_volume: Option<f32>,
    /// Volume at the end of the volume curve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_volume: Option<f32>,
    /// Full replacement pitch curve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_curve: Option<AnimationCurve>,
    /// Full replacement volume curve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_curve: Option<AnimationCurve>,
    /// Start playback at a random position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randomize_start_time: Option<bool>,
    /// `Some(false)` silences the role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl OverrideDefinition {
    /// Definition replacing the clip of `key` with a single file
    pub fn new(name: impl Into<String>, key: impl Into<SoundKey>, file: impl Into<PathBuf>) -> Self {
        Self {
            files: vec![file.into()],
            ..Self::empty(name, key)
        }
    }

    /// Definition that references no file yet
    pub fn empty(name: impl Into<String>, key: impl Into<SoundKey>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            files: Vec::new(),
            pitch: None,
            min_pitch: None,
            max_pitch: None,
            min_volume: None,
            max_volume: None,
            pitch_curve: None,
            volume_curve: None,
            randomize_start_time: None,
            enabled: None,
        }
    }

    /// Append a file (round-robin member on clip-set roles)
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Set the absolute pitch
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Set the pitch range
    pub fn with_pitch_range(mut self, min: f32, max: f32) -> Self {
        self.min_pitch = Some(min);
        self.max_pitch = Some(max);
        self
    }

    /// Set the volume range
    pub fn with_volume_range(mut self, min: f32, max: f32) -> Self {
        self.min_volume = Some(min);
        self.max_volume = Some(max);
        self
    }

    /// Replace the pitch curve
    pub fn with_pitch_curve(mut self, curve: AnimationCurve) -> Self {
        self.pitch_curve = Some(curve);
        self
    }

    /// Replace the volume curve
    pub fn with_volume_curve(mut self, curve: AnimationCurve) -> Self {
        self.volume_curve = Some(curve);
        self
    }

    /// Set the randomize-start flag
    pub fn with_randomize_start_time(mut self, randomize: bool) -> Self {
        self.randomize_start_time = Some(randomize);
        self
    }

    /// Enable or silence the role
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Whether the role is silenced
    pub fn is_disabled(&self) -> bool {
        self.enabled == Some(false)
    }

    /// Whether any pitch or volume field is set
    pub fn has_modulation(&self) -> bool {
        self.pitch.is_some()
            || self.min_pitch.is_some()
            || self.max_pitch.is_some()
            || self.min_volume.is_some()
            || self.max_volume.is_some()
            || self.pitch_curve.is_some()
            || self.volume_curve.is_some()
    }

    /// Reject definitions that cannot be applied
    pub fn validate(&self) -> Result<(), SoundError> {
        if self.files.is_empty() && !self.is_disabled() {
            return Err(SoundError::configuration(&self.name, "no audio file referenced"));
        }
        let values = [
            self.pitch,
            self.min_pitch,
            self.max_pitch,
            self.min_volume,
            self.max_volume,
        ];
        if values.iter().flatten().any(|v| !v.is_finite()) {
            return Err(SoundError::configuration(&self.name, "non-finite pitch or volume"));
        }
        if let (Some(min), Some(max)) = (self.min_pitch, self.max_pitch) {
            if min > max {
                return Err(SoundError::configuration(
                    &self.name,
                    format!("min_pitch {min} exceeds max_pitch {max}"),
                ));
            }
        }
        if self.pitch.is_some_and(|p| p <= 0.0) {
            return Err(SoundError::configuration(&self.name, "pitch must be positive"));
        }
        Ok(())
    }
}

/// Overrides explicitly selected for one vehicle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    entries: BTreeMap<SoundKey, OverrideDefinition>,
}

impl OverrideSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `definition` for its key, returning the previous selection
    pub fn insert(&mut self, definition: OverrideDefinition) -> Option<OverrideDefinition> {
        self.entries.insert(definition.key.clone(), definition)
    }

    /// Drop the selection for `key`
    pub fn remove(&mut self, key: &SoundKey) -> Option<OverrideDefinition> {
        self.entries.remove(key)
    }

    /// Selection for `key`
    pub fn get(&self, key: &SoundKey) -> Option<&OverrideDefinition> {
        self.entries.get(key)
    }

    /// Whether `key` has a selection
    pub fn contains(&self, key: &SoundKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Every selection, ordered by key
    pub fn iter(&self) -> impl Iterator<Item = (&SoundKey, &OverrideDefinition)> {
        self.entries.iter()
    }

    /// Keys with a selection
    pub fn keys(&self) -> impl Iterator<Item = &SoundKey> {
        self.entries.keys()
    }

    /// Key -> override name, the persisted form
    pub fn names(&self) -> BTreeMap<SoundKey, String> {
        self.entries
            .iter()
            .map(|(k, d)| (k.clone(), d.name.clone()))
            .collect()
    }

    /// Number of selections
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every selection
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<OverrideDefinition> for OverrideSet {
    fn from_iter<I: IntoIterator<Item = OverrideDefinition>>(iter: I) -> Self {
        let mut set = Self::new();
        for definition in iter {
            set.insert(definition);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Role;

    #[test]
    fn test_validate() {
        let ok = OverrideDefinition::new("loud", Role::HornLoop, "loud.ogg").with_pitch_range(0.9, 1.0);
        assert!(ok.validate().is_ok());

        let no_file = OverrideDefinition::empty("none", Role::Bell);
        assert!(no_file.validate().is_err());
        // silencing needs no file
        assert!(no_file.with_enabled(false).validate().is_ok());

        let inverted = OverrideDefinition::new("bad", Role::Bell, "b.ogg").with_pitch_range(1.2, 0.8);
        assert!(inverted.validate().is_err());

        let nan = OverrideDefinition::new("nan", Role::Bell, "b.ogg").with_pitch(f32::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_set_replaces_per_key() {
        let mut set = OverrideSet::new();
        assert!(set
            .insert(OverrideDefinition::new("a", Role::Bell, "a.ogg"))
            .is_none());
        let previous = set.insert(OverrideDefinition::new("b", Role::Bell, "b.ogg"));
        assert_eq!(previous.map(|d| d.name), Some("a".to_string()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.names().get(&SoundKey::Role(Role::Bell)).map(String::as_str), Some("b"));
    }

    #[test]
    fn test_modulation_flag() {
        let plain = OverrideDefinition::new("plain", Role::HornHit, "hit.ogg");
        assert!(!plain.has_modulation());
        assert!(plain.with_pitch(1.1).has_modulation());
    }
}
