//! Sound catalog
//!
//! Named override definitions available per key. The on-disk layout is one
//! directory per category:
//!
//! ```text
//! sounds/
//!   horn_loop/
//!     nathan_k5la.ogg
//!     nathan_k5la.toml      # optional sidecar
//!   bell/
//!     ring.wav
//!   dynamo/                 # not a role: becomes generic:dynamo
//!     whine.ogg
//! ```
//!
//! A sidecar carries the optional fields of [`OverrideDefinition`] plus
//! `clips`, extra files (relative to the category directory) that join the
//! main file as a round-robin set.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::definition::OverrideDefinition;
use crate::catalog::{Role, SoundKey};
use crate::error::{BatchReport, SoundError};
use crate::foundation::curve::AnimationCurve;
use crate::scene::AudioFormat;

/// Per-file sidecar configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DefinitionFile {
    pitch: Option<f32>,
    min_pitch: Option<f32>,
    max_pitch: Option<f32>,
    min_volume: Option<f32>,
    max_volume: Option<f32>,
    pitch_curve: Option<AnimationCurve>,
    volume_curve: Option<AnimationCurve>,
    randomize_start_time: Option<bool>,
    enabled: Option<bool>,
    clips: Vec<PathBuf>,
}

impl DefinitionFile {
    fn into_definition(self, name: String, key: SoundKey, file: PathBuf, dir: &Path) -> OverrideDefinition {
        let mut files = vec![file];
        files.extend(self.clips.into_iter().map(|c| dir.join(c)));
        OverrideDefinition {
            name,
            key,
            files,
            pitch: self.pitch,
            min_pitch: self.min_pitch,
            max_pitch: self.max_pitch,
            min_volume: self.min_volume,
            max_volume: self.max_volume,
            pitch_curve: self.pitch_curve,
            volume_curve: self.volume_curve,
            randomize_start_time: self.randomize_start_time,
            enabled: self.enabled,
        }
    }
}

/// Override definitions available per key, looked up by name
#[derive(Debug, Default, Clone)]
pub struct SoundCatalog {
    definitions: HashMap<SoundKey, Vec<OverrideDefinition>>,
}

impl SoundCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, replacing one with the same key and name
    pub fn insert(&mut self, definition: OverrideDefinition) {
        let entries = self.definitions.entry(definition.key.clone()).or_default();
        match entries.iter_mut().find(|d| d.name == definition.name) {
            Some(existing) => *existing = definition,
            None => entries.push(definition),
        }
    }

    /// Definition `name` for `key`
    pub fn get(&self, key: &SoundKey, name: &str) -> Option<&OverrideDefinition> {
        self.definitions.get(key)?.iter().find(|d| d.name == name)
    }

    /// Every definition for `key`
    pub fn definitions(&self, key: &SoundKey) -> &[OverrideDefinition] {
        self.definitions.get(key).map_or(&[], Vec::as_slice)
    }

    /// Keys with at least one definition, sorted
    pub fn keys(&self) -> Vec<&SoundKey> {
        let mut keys: Vec<_> = self.definitions.keys().collect();
        keys.sort();
        keys
    }

    /// Total number of definitions
    pub fn len(&self) -> usize {
        self.definitions.values().map(Vec::len).sum()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.values().all(Vec::is_empty)
    }

    /// Drop every definition
    pub fn clear(&mut self) {
        self.definitions.clear();
    }

    /// Replace the catalog contents with the sound directory at `root`
    ///
    /// Only an unreadable `root` is an error. Unreadable categories and
    /// broken sidecars are recorded in the report and skipped.
    pub fn load_dir(&mut self, root: &Path) -> Result<BatchReport, SoundError> {
        let categories = sorted_entries(root)?;
        self.clear();

        let mut report = BatchReport::new();
        for dir in categories.into_iter().filter(|p| p.is_dir()) {
            let Some(category) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let key = Role::from_stem(category).map_or_else(|| SoundKey::Generic(category.to_string()), SoundKey::Role);

            let files = match sorted_entries(&dir) {
                Ok(files) => files,
                Err(e) => {
                    log::warn!("Skipping sound category {}: {}", category, e);
                    report.record_failure(category, e);
                    continue;
                }
            };
            for file in files
                .into_iter()
                .filter(|p| p.is_file() && AudioFormat::is_supported_extension(p))
            {
                match load_definition(&key, &dir, file) {
                    Ok(definition) => {
                        log::debug!("Catalogued {} for {}", definition.name, key);
                        self.insert(definition);
                        report.record_success();
                    }
                    Err((label, e)) => {
                        log::warn!("Skipping {}: {}", label, e);
                        report.record_failure(label, e);
                    }
                }
            }
        }

        log::info!(
            "Sound catalog loaded {} definition(s) for {} key(s) from {}",
            self.len(),
            self.definitions.len(),
            root.display()
        );
        Ok(report)
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, SoundError> {
    let entries = fs::read_dir(dir).map_err(|e| SoundError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(|e| SoundError::io(dir, e))?.path());
    }
    paths.sort();
    Ok(paths)
}

fn load_definition(key: &SoundKey, dir: &Path, file: PathBuf) -> Result<OverrideDefinition, (String, SoundError)> {
    let name = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let label = file.display().to_string();

    let sidecar = file.with_extension("toml");
    let settings = if sidecar.is_file() {
        let text = fs::read_to_string(&sidecar).map_err(|e| (label.clone(), SoundError::io(&sidecar, e)))?;
        toml::from_str::<DefinitionFile>(&text)
            .map_err(|e| (label.clone(), SoundError::configuration(&name, format!("sidecar: {e}"))))?
    } else {
        DefinitionFile::default()
    };

    let definition = settings.into_definition(name, key.clone(), file, dir);
    definition.validate().map_err(|e| (label, e))?;
    Ok(definition)
}
