//! # Loco Audio
//!
//! Per-role sound override engine for simulated locomotives.
//!
//! ## Features
//!
//! - **Discovery**: maps sound roles (horn, bell, engine idle, steam chuff
//!   bands, ...) to the audio objects that realize them on each vehicle type
//! - **Non-destructive overrides**: the first touch of any role captures its
//!   vanilla state before anything is changed
//! - **Restoration**: back to the captured state, or to the type's prefab
//!   when no capture exists
//! - **Persistence**: override selections survive restarts, keyed by the
//!   vehicle's human-readable identifier
//!
//! ## Quick Start
//!
//! ```rust
//! use loco_audio::prelude::*;
//!
//! let mut scene = AudioScene::new();
//! PrefabBuilder::new(&mut scene, "DE2 Audio")
//!     .multi_layer("Horn", "Clip", &["de2_horn"])
//!     .multi_layer("Bell", "Clip", &["de2_bell"])
//!     .finish(VehicleType::DE2);
//! let loco = scene.spawn_instance("L-001", VehicleType::DE2);
//! scene.instantiate_audio(loco);
//!
//! let mut engine = SoundEngine::with_loader(SoundConfig::default(), Box::new(OpaqueClipLoader));
//! let horn = OverrideDefinition::new("k5la", Role::HornLoop, "sounds/k5la.ogg").with_pitch_range(0.9, 1.0);
//! engine.set_override(&mut scene, loco, horn)?;
//! engine.clear_override(&mut scene, loco, &Role::HornLoop.into())?;
//! # Ok::<(), loco_audio::SoundError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod events;
pub mod foundation;
pub mod overrides;
pub mod registry;
pub mod scene;
pub mod vanilla;

mod applicator;
mod engine;
mod error;
mod restorator;

pub use applicator::Applicator;
pub use engine::{OverrideStatus, SoundEngine};
pub use error::{BatchReport, SoundError};
pub use restorator::{RestoreOutcome, Restorator};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        catalog::{Role, Shape, SoundKey, VehicleType},
        config::{Config, SoundConfig},
        events::HostEvent,
        overrides::{OverrideDefinition, OverrideSet, SoundCatalog},
        scene::{AudioComponent, AudioScene, ClipLoader, FsClipLoader, InstanceKey, OpaqueClipLoader, PrefabBuilder},
        BatchReport, OverrideStatus, RestoreOutcome, SoundEngine, SoundError,
    };
}
