//! Sound override demo
//!
//! Drives the override engine the way a host simulation would: builds two
//! vehicle types, spawns a small roster, fires the world-loaded signal and
//! then selects, plays and reverts a few overrides while the simulated
//! throttle moves.
//!
//! Usage: `override_demo [config.toml|config.ron]`

use std::error::Error;

use loco_audio::foundation::{logging, AnimationCurve};
use loco_audio::prelude::*;
use loco_audio::scene::builder::layered;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FRAMES: usize = 6;

struct DemoApp {
    scene: AudioScene,
    engine: SoundEngine,
    rng: StdRng,
    roster: Vec<InstanceKey>,
}

impl DemoApp {
    fn new(config: SoundConfig) -> Self {
        let mut scene = AudioScene::new();
        build_prefabs(&mut scene);

        let loader: Box<dyn ClipLoader> = if config.sound_dir.is_some() {
            Box::new(FsClipLoader::new())
        } else {
            Box::new(OpaqueClipLoader)
        };
        let mut engine = SoundEngine::with_loader(config, loader);
        if engine.config().sound_dir.is_none() {
            register_builtin_sounds(engine.catalog_mut());
        }

        let mut roster = Vec::new();
        for (identifier, vehicle_type) in [
            ("L-001", VehicleType::DE6),
            ("L-002", VehicleType::DE6),
            ("S-282", VehicleType::S282),
        ] {
            let loco = scene.spawn_instance(identifier, vehicle_type);
            engine.send_event(HostEvent::VehicleSpawned(loco));
            roster.push(loco);
        }

        Self {
            scene,
            engine,
            rng: StdRng::seed_from_u64(282),
            roster,
        }
    }

    fn load_world(&mut self) {
        // the second diesel's audio is still being built when the world reports ready
        for slot in [0, 2] {
            self.scene.instantiate_audio(self.roster[slot]);
        }
        self.engine.send_event(HostEvent::WorldLoaded);
        let report = self.engine.process_events(&mut self.scene);
        log_report("world load", &report);
    }

    fn select_overrides(&mut self) {
        let picks = [
            (0, Role::HornLoop, "nathan_k5la"),
            (1, Role::Bell, "brass_bell"),
            (2, Role::SteamChuff4Hz, "heavy_exhaust"),
            (2, Role::Whistle, "hooter"),
            (0, Role::Whistle, "hooter"),
        ];
        for (slot, role, name) in picks {
            let loco = self.roster[slot];
            let Some(definition) = self.engine.catalog().get(&role.into(), name).cloned() else {
                log::warn!("'{}' is not in the catalog", name);
                continue;
            };
            match self.engine.set_override(&mut self.scene, loco, definition) {
                Ok(status) => log::info!("{} on {}: {:?}", name, self.identifier(loco), status),
                Err(e) if e.is_not_found() => log::info!("{} skipped on {}: {}", name, self.identifier(loco), e),
                Err(e) => log::error!("{} failed on {}: {}", name, self.identifier(loco), e),
            }
        }
    }

    fn run_frames(&mut self) {
        for frame in 0..FRAMES {
            if frame == 2 {
                // host finishes building the late vehicle
                let late = self.roster[1];
                self.scene.instantiate_audio(late);
            }
            let throttle: f32 = self.rng.gen_range(0.0..=1.0);
            for loco in self.roster.clone() {
                self.engine.send_event(HostEvent::AudioParameterRead(loco));
                self.drive(loco, throttle);
            }
            let report = self.engine.process_events(&mut self.scene);
            if report.succeeded > 0 {
                log_report(&format!("frame {frame}"), &report);
            }
        }
    }

    fn drive(&mut self, loco: InstanceKey, throttle: f32) {
        let Some(root) = self.scene.audio_root(loco) else {
            return;
        };
        let keys: Vec<_> = self.scene.walk(root, 16, true).into_iter().map(|v| v.key).collect();
        for key in keys {
            match self.scene.component_mut(key) {
                Some(AudioComponent::MultiLayer(audio)) => {
                    if !audio.is_playing() {
                        audio.play(&mut self.rng);
                    }
                    audio.update(throttle);
                }
                Some(AudioComponent::ClipSet(set)) => {
                    if let Some(clip) = set.pick(&mut self.rng) {
                        log::trace!("one-shot {}", clip.name());
                    }
                }
                _ => {}
            }
        }
    }

    fn revert(&mut self) {
        let first = self.roster[0];
        match self.engine.clear_override(&mut self.scene, first, &Role::HornLoop.into()) {
            Ok(outcome) => log::info!("horn on {} restored ({:?})", self.identifier(first), outcome),
            Err(e) => log::error!("horn restore failed: {}", e),
        }

        let steam = self.roster[2];
        match self.engine.reset_instance(&mut self.scene, steam) {
            Ok(report) => log_report("steam reset", &report),
            Err(e) => log::error!("reset failed: {}", e),
        }

        let late = self.roster[1];
        self.engine.send_event(HostEvent::VehicleDestroyed(late));
        self.engine.process_events(&mut self.scene);
        self.scene.destroy_instance(late);
    }

    fn identifier(&self, loco: InstanceKey) -> &str {
        self.scene.instance(loco).map_or("?", |v| v.identifier.as_str())
    }
}

fn build_prefabs(scene: &mut AudioScene) {
    let mut horn = layered("Clip", &["de6_horn_loop", "de6_horn_reverb"]);
    horn.layers[0].use_volume_curve = true;
    horn.layers[0].volume_curve = AnimationCurve::ease_in_out(0.0, 0.3, 1.0, 1.0);
    let mut idle = layered("Clip", &["de6_idle"]);
    idle.layers[0].use_pitch_curve = true;
    idle.layers[0].pitch_curve = AnimationCurve::linear(0.0, 0.9, 1.0, 1.4);
    idle.layers[0].inertia = 0.6;

    PrefabBuilder::new(scene, "DE6 Audio")
        .layered_audio("Cab/Horn", horn)
        .clip_set("Cab/HornHit", "HornHit", &["de6_horn_hit_01", "de6_horn_hit_02"])
        .multi_layer("Cab/Bell", "Clip", &["de6_bell"])
        .layered_audio("Engine/Idle", idle)
        .multi_layer("Engine/TractionMotors", "Clip", &["de6_traction"])
        .clip_set("Engine/Startup", "EngineStartup", &["de6_start"])
        .multi_layer("Cooling/Fan", "Clip", &["de6_radiator_fan"])
        .finish(VehicleType::DE6);

    PrefabBuilder::new(scene, "S282 Audio")
        .multi_layer("Whistle", "Clip", &["s282_whistle"])
        .multi_layer("Bell", "Clip", &["s282_bell"])
        .chuff_controller("Chuff")
        .multi_layer("Chuff/Band_2Hz", "Clip", &["s282_chuff_slow"])
        .multi_layer("Chuff/Band_4Hz", "Clip", &["s282_chuff_mid"])
        .multi_layer("Chuff/Band_8Hz", "Clip", &["s282_chuff_fast"])
        .finish(VehicleType::S282);
}

fn register_builtin_sounds(catalog: &mut SoundCatalog) {
    catalog.insert(
        OverrideDefinition::new("nathan_k5la", Role::HornLoop, "sounds/horn_loop/nathan_k5la.ogg")
            .with_pitch_range(0.9, 1.0),
    );
    catalog.insert(OverrideDefinition::new("brass_bell", Role::Bell, "sounds/bell/brass_bell.ogg").with_pitch(0.95));
    catalog.insert(
        OverrideDefinition::new("heavy_exhaust", Role::SteamChuff4Hz, "sounds/steam_chuff_4hz/heavy.ogg")
            .with_volume_range(0.4, 1.0)
            .with_randomize_start_time(true),
    );
    catalog.insert(OverrideDefinition::new("hooter", Role::Whistle, "sounds/whistle/hooter.ogg"));
}

fn log_report(label: &str, report: &BatchReport) {
    log::info!(
        "{}: {} ok, {} skipped, {} failed",
        label,
        report.succeeded,
        report.skipped,
        report.failures.len()
    );
    for (item, error) in &report.failures {
        log::warn!("  {}: {}", item, error);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "override_demo.toml".to_string());
    let config = SoundConfig::load_or_default(&config_path)?;
    logging::init(&config.log_level);
    log::info!("Starting override demo with {}", config_path);

    let mut app = DemoApp::new(config);
    app.load_world();
    app.select_overrides();
    app.run_frames();
    app.revert();

    log::info!(
        "Done: {} vanilla snapshot(s) held, {} vehicle type(s) mapped",
        app.engine.vanilla().len(),
        app.engine.discovery().mapped_types()
    );
    Ok(())
}
