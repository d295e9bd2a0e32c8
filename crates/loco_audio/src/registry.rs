//! Override registry
//!
//! Authoritative override set per vehicle plus its on-disk form. Persisted
//! entries are keyed by the vehicle's human-readable identifier, since
//! instance handles do not survive a restart:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": [
//!     {
//!       "identifier": "L-042",
//!       "vehicle_type": "DE6",
//!       "overrides": { "horn_loop": "nathan_k5la", "generic:dynamo": "whine" }
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::applicator::Applicator;
use crate::catalog::{SoundKey, VehicleType};
use crate::config::RegistryConfig;
use crate::error::{BatchReport, SoundError};
use crate::overrides::{OverrideDefinition, OverrideSet, SoundCatalog};
use crate::scene::{AudioScene, InstanceKey};

const FORMAT_VERSION: u32 = 1;

/// Persisted overrides of one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedEntry {
    /// Human-readable vehicle identifier
    pub identifier: String,
    /// Vehicle type at the time of saving
    pub vehicle_type: VehicleType,
    /// Key -> override name
    pub overrides: BTreeMap<SoundKey, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    #[serde(default)]
    entries: Vec<SavedEntry>,
}

/// Override sets per vehicle and their persistence
#[derive(Debug, Default)]
pub struct Registry {
    path: Option<PathBuf>,
    autosave: bool,
    sets: HashMap<InstanceKey, OverrideSet>,
    saved: BTreeMap<String, SavedEntry>,
    customized: HashSet<InstanceKey>,
    pending: HashMap<InstanceKey, OverrideSet>,
    unresolved: HashMap<InstanceKey, BTreeMap<SoundKey, String>>,
}

impl Registry {
    /// Create a registry persisting according to `config`
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            path: config.path.clone(),
            autosave: config.autosave,
            ..Self::default()
        }
    }

    /// Registry that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Storage file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Override set of a vehicle, created empty on first access
    pub fn get(&mut self, instance: InstanceKey) -> &OverrideSet {
        self.sets.entry(instance).or_default()
    }

    /// Override set of a vehicle, mutably
    pub fn get_mut(&mut self, instance: InstanceKey) -> &mut OverrideSet {
        self.sets.entry(instance).or_default()
    }

    /// Override set of a vehicle without creating one
    pub fn peek(&self, instance: InstanceKey) -> Option<&OverrideSet> {
        self.sets.get(&instance)
    }

    /// Whether any override was ever applied to the vehicle
    pub fn is_customized(&self, instance: InstanceKey) -> bool {
        self.customized.contains(&instance)
    }

    /// Flag the vehicle as customized
    pub fn mark_customized(&mut self, instance: InstanceKey) {
        self.customized.insert(instance);
    }

    /// Persisted entry for an identifier
    pub fn saved_entry(&self, identifier: &str) -> Option<&SavedEntry> {
        self.saved.get(identifier)
    }

    /// Every persisted entry, ordered by identifier
    pub fn saved_entries(&self) -> impl Iterator<Item = &SavedEntry> {
        self.saved.values()
    }

    /// Overrides waiting for the vehicle's audio graph
    pub fn pending(&self, instance: InstanceKey) -> Option<&OverrideSet> {
        self.pending.get(&instance).filter(|p| !p.is_empty())
    }

    /// Queue an override that could not be applied yet
    pub fn defer(&mut self, instance: InstanceKey, definition: OverrideDefinition) {
        self.pending.entry(instance).or_default().insert(definition);
    }

    /// Drop a queued or unresolved override, e.g. after the operator cleared it
    pub fn cancel_pending(&mut self, instance: InstanceKey, key: &SoundKey) {
        if let Some(pending) = self.pending.get_mut(&instance) {
            pending.remove(key);
        }
        if let Some(unresolved) = self.unresolved.get_mut(&instance) {
            unresolved.remove(key);
        }
    }

    /// Saved selections the catalog could not provide, by key
    ///
    /// They stay persisted alongside the live set so that a later catalog
    /// fix recovers them.
    pub fn unresolved(&self, instance: InstanceKey) -> Option<&BTreeMap<SoundKey, String>> {
        self.unresolved.get(&instance).filter(|u| !u.is_empty())
    }

    /// Keep a saved selection whose definition is missing from the catalog
    pub fn keep_unresolved(&mut self, instance: InstanceKey, key: SoundKey, name: impl Into<String>) {
        self.unresolved.entry(instance).or_default().insert(key, name.into());
    }

    /// Store `set` as the vehicle's override set and persist it
    ///
    /// The previous entry for the vehicle's identifier is replaced. Unresolved
    /// selections are written back unless `set` covers their key; with
    /// neither, the entry is removed altogether.
    pub fn save(&mut self, scene: &AudioScene, instance: InstanceKey, set: OverrideSet) -> Result<(), SoundError> {
        let vehicle = scene.instance(instance).ok_or(SoundError::UnknownInstance)?;
        self.saved.remove(&vehicle.identifier);

        let mut overrides = self.unresolved.get(&instance).cloned().unwrap_or_default();
        overrides.extend(set.names());
        if !overrides.is_empty() {
            self.saved.insert(
                vehicle.identifier.clone(),
                SavedEntry {
                    identifier: vehicle.identifier.clone(),
                    vehicle_type: vehicle.vehicle_type.clone(),
                    overrides,
                },
            );
        }
        self.sets.insert(instance, set);
        if self.autosave {
            self.flush()?;
        }
        Ok(())
    }

    /// Re-persist the vehicle's current override set
    pub fn save_current(&mut self, scene: &AudioScene, instance: InstanceKey) -> Result<(), SoundError> {
        let set = self.sets.get(&instance).cloned().unwrap_or_default();
        self.save(scene, instance, set)
    }

    /// Write every persisted entry to the storage file
    pub fn flush(&self) -> Result<(), SoundError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = RegistryFile {
            version: FORMAT_VERSION,
            entries: self.saved.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| SoundError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SoundError::io(parent, e))?;
        }
        // write-then-rename so a crash never leaves a truncated registry
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|e| SoundError::io(&staging, e))?;
        fs::rename(&staging, path).map_err(|e| SoundError::io(path, e))?;
        log::debug!("Registry saved {} entr(ies) to {}", file.entries.len(), path.display());
        Ok(())
    }

    /// Replace the persisted entries with the storage file's contents
    ///
    /// A missing file is an empty registry; an unreadable or corrupt one is
    /// logged and also treated as empty. Returns the number of entries.
    pub fn load_all(&mut self) -> usize {
        self.saved.clear();
        let Some(path) = &self.path else {
            return 0;
        };
        if !path.exists() {
            log::debug!("No registry at {}, starting empty", path.display());
            return 0;
        }

        let parsed = fs::read_to_string(path)
            .map_err(|e| SoundError::io(path, e))
            .and_then(|text| serde_json::from_str::<RegistryFile>(&text).map_err(|e| SoundError::Parse(e.to_string())));
        let file = match parsed {
            Ok(file) => file,
            Err(e) => {
                log::warn!("Ignoring unreadable registry {}: {}", path.display(), e);
                return 0;
            }
        };
        if file.version != FORMAT_VERSION {
            log::warn!(
                "Registry {} has format version {}, expected {}; reading anyway",
                path.display(),
                file.version,
                FORMAT_VERSION
            );
        }

        for entry in file.entries {
            if entry.overrides.is_empty() {
                continue;
            }
            self.saved.insert(entry.identifier.clone(), entry);
        }
        log::info!("Registry loaded {} vehicle(s) from {}", self.saved.len(), path.display());
        self.saved.len()
    }

    /// Replay every persisted entry onto the live vehicles
    ///
    /// Entries whose vehicle no longer exists are dropped; entries whose
    /// vehicle changed type are skipped. Overrides whose object cannot be
    /// resolved yet are queued as pending.
    pub fn apply_saved(
        &mut self,
        scene: &mut AudioScene,
        applicator: &mut Applicator<'_>,
        catalog: &SoundCatalog,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        let mut compacted = false;
        let entries: Vec<SavedEntry> = self.saved.values().cloned().collect();

        for entry in entries {
            let Some(instance) = scene.find_instance(&entry.identifier) else {
                log::info!("Dropping overrides of vanished vehicle {}", entry.identifier);
                self.saved.remove(&entry.identifier);
                compacted = true;
                report.record_skip();
                continue;
            };
            let live_type = scene
                .instance(instance)
                .map(|v| v.vehicle_type.clone())
                .unwrap_or_else(|| entry.vehicle_type.clone());
            if live_type != entry.vehicle_type {
                log::warn!(
                    "Vehicle {} is a {} but its overrides were saved for a {}; skipping",
                    entry.identifier,
                    live_type,
                    entry.vehicle_type
                );
                report.record_skip();
                continue;
            }

            let mut set = OverrideSet::new();
            self.unresolved.remove(&instance);
            for (key, name) in &entry.overrides {
                let label = format!("{}/{}", entry.identifier, key);
                let Some(definition) = catalog.get(key, name) else {
                    let error = SoundError::configuration(name, format!("override not found in catalog for {key}"));
                    log::warn!("{}: {}", label, error);
                    report.record_failure(label, error);
                    self.keep_unresolved(instance, key.clone(), name.clone());
                    continue;
                };
                set.insert(definition.clone());

                match applicator.apply(scene, instance, key, Some(definition)) {
                    Ok(_) => {
                        self.customized.insert(instance);
                        report.record_success();
                    }
                    Err(e) if e.is_not_found() => {
                        log::debug!("{} deferred: {}", label, e);
                        self.defer(instance, definition.clone());
                        self.customized.insert(instance);
                        report.record_skip();
                    }
                    Err(e) => {
                        log::warn!("{}: {}", label, e);
                        report.record_failure(label, e);
                    }
                }
            }
            self.sets.insert(instance, set);
        }

        if compacted && self.autosave {
            if let Err(e) = self.flush() {
                log::warn!("Failed to write compacted registry: {}", e);
            }
        }
        report
    }

    /// Retry pending overrides of one vehicle
    ///
    /// Cheap for vehicles that were never customized.
    pub fn retry_pending(
        &mut self,
        scene: &mut AudioScene,
        instance: InstanceKey,
        applicator: &mut Applicator<'_>,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        if !self.customized.contains(&instance) {
            return report;
        }
        let Some(pending) = self.pending.remove(&instance) else {
            return report;
        };

        let mut still_pending = OverrideSet::new();
        for (key, definition) in pending.iter() {
            match applicator.apply(scene, instance, key, Some(definition)) {
                Ok(_) => {
                    log::debug!("Applied deferred override '{}' to {}", definition.name, key);
                    report.record_success();
                }
                Err(e) if e.is_not_found() => {
                    still_pending.insert(definition.clone());
                    report.record_skip();
                }
                Err(e) => {
                    log::warn!("Deferred override '{}' failed: {}", definition.name, e);
                    report.record_failure(key.to_string(), e);
                }
            }
        }
        if !still_pending.is_empty() {
            self.pending.insert(instance, still_pending);
        }
        report
    }

    /// Forget the in-memory state of a destroyed vehicle
    ///
    /// Persisted entries stay until the next [`apply_saved`](Self::apply_saved)
    /// finds the vehicle gone.
    pub fn forget_instance(&mut self, instance: InstanceKey) {
        self.sets.remove(&instance);
        self.pending.remove(&instance);
        self.customized.remove(&instance);
        self.unresolved.remove(&instance);
    }

    /// Keep only the in-memory state of vehicles for which `alive` holds
    pub fn retain_instances(&mut self, mut alive: impl FnMut(InstanceKey) -> bool) {
        self.sets.retain(|k, _| alive(*k));
        self.pending.retain(|k, _| alive(*k));
        self.customized.retain(|k| alive(*k));
        self.unresolved.retain(|k, _| alive(*k));
    }

    /// Drop all in-memory per-vehicle state (handles are invalid after a world reload)
    pub fn clear_instances(&mut self) {
        self.sets.clear();
        self.pending.clear();
        self.customized.clear();
        self.unresolved.clear();
    }
}
