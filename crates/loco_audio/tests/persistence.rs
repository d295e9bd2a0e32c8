//! Registry persistence across simulated restarts

mod common;

use std::fs;

use common::{engine_with, horn_and_bell_scene, layered_at, spawn_built};
use loco_audio::prelude::*;
use tempfile::TempDir;

fn write_sound(root: &std::path::Path, category: &str, file: &str) {
    let dir = root.join(category);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), b"OggS\0\0\0\0").unwrap();
}

fn config(dir: &TempDir) -> SoundConfig {
    SoundConfig::new()
        .with_sound_dir(dir.path().join("sounds"))
        .with_registry_path(dir.path().join("state/registry.json"))
}

#[test]
fn test_overrides_survive_restart() {
    let dir = TempDir::new().unwrap();
    write_sound(&dir.path().join("sounds"), "horn_loop", "k5la.ogg");
    write_sound(&dir.path().join("sounds"), "bell", "ding.ogg");

    // first session: select two overrides on one vehicle, none on another
    {
        let mut scene = horn_and_bell_scene();
        let first = spawn_built(&mut scene, "L-100", VehicleType::DE6);
        spawn_built(&mut scene, "L-200", VehicleType::DE6);
        let mut engine = engine_with(config(&dir));
        engine.send_event(HostEvent::WorldLoaded);
        engine.process_events(&mut scene);

        let horn = engine
            .catalog()
            .get(&Role::HornLoop.into(), "k5la")
            .cloned()
            .unwrap();
        let bell = engine.catalog().get(&Role::Bell.into(), "ding").cloned().unwrap();
        engine.set_override(&mut scene, first, horn).unwrap();
        engine.set_override(&mut scene, first, bell).unwrap();
    }

    // second session: fresh handles, one extra vehicle that was never customized
    let mut scene = horn_and_bell_scene();
    spawn_built(&mut scene, "L-300", VehicleType::DE6);
    let first = spawn_built(&mut scene, "L-100", VehicleType::DE6);
    let mut engine = engine_with(config(&dir));
    engine.send_event(HostEvent::WorldLoaded);
    let report = engine.process_events(&mut scene);
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let set = engine.registry().peek(first).cloned().unwrap();
    let names: Vec<_> = set.iter().map(|(k, d)| (k.to_string(), d.name.clone())).collect();
    assert_eq!(
        names,
        vec![
            ("horn_loop".to_string(), "k5la".to_string()),
            ("bell".to_string(), "ding".to_string()),
        ]
    );
    assert!(engine.registry().is_customized(first));

    let horn = engine
        .discovery_mut()
        .resolve(&scene, first, &Role::HornLoop.into())
        .unwrap();
    assert_eq!(layered_at(&scene, horn).layers[0].clip_name(), Some("k5la"));
}

#[test]
fn test_vanished_vehicles_are_dropped_silently() {
    let dir = TempDir::new().unwrap();
    write_sound(&dir.path().join("sounds"), "bell", "ding.ogg");

    {
        let mut scene = horn_and_bell_scene();
        let gone = spawn_built(&mut scene, "L-GONE", VehicleType::DE6);
        let mut engine = engine_with(config(&dir));
        engine.on_world_loaded(&mut scene);
        let bell = engine.catalog().get(&Role::Bell.into(), "ding").cloned().unwrap();
        engine.set_override(&mut scene, gone, bell).unwrap();
    }

    let mut scene = horn_and_bell_scene();
    let mut engine = engine_with(config(&dir));
    let report = engine.on_world_loaded(&mut scene);
    assert!(report.is_clean());
    assert_eq!(engine.registry().saved_entries().count(), 0);

    let text = fs::read_to_string(dir.path().join("state/registry.json")).unwrap();
    assert!(!text.contains("L-GONE"));
}

#[test]
fn test_late_spawned_vehicle_gets_saved_overrides() {
    let dir = TempDir::new().unwrap();
    write_sound(&dir.path().join("sounds"), "bell", "ding.ogg");

    {
        let mut scene = horn_and_bell_scene();
        let loco = spawn_built(&mut scene, "L-LATE", VehicleType::DE6);
        let mut engine = engine_with(config(&dir));
        engine.on_world_loaded(&mut scene);
        let bell = engine.catalog().get(&Role::Bell.into(), "ding").cloned().unwrap();
        engine.set_override(&mut scene, loco, bell).unwrap();
    }

    // the vehicle exists at load time but its audio graph is built later
    let mut scene = horn_and_bell_scene();
    let loco = scene.spawn_instance("L-LATE", VehicleType::DE6);
    let mut engine = engine_with(config(&dir));
    let report = engine.on_world_loaded(&mut scene);
    assert_eq!(report.succeeded, 1, "catalog entry only");
    assert!(engine.registry().pending(loco).is_some());

    scene.instantiate_audio(loco);
    engine.send_event(HostEvent::AudioParameterRead(loco));
    let report = engine.process_events(&mut scene);
    assert_eq!(report.succeeded, 1);

    let bell = engine
        .discovery_mut()
        .resolve(&scene, loco, &Role::Bell.into())
        .unwrap();
    assert_eq!(layered_at(&scene, bell).layers[0].clip_name(), Some("ding"));
}

#[test]
fn test_corrupt_registry_starts_empty() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("state")).unwrap();
    fs::write(dir.path().join("state/registry.json"), "[[[ definitely not json").unwrap();

    let mut scene = horn_and_bell_scene();
    spawn_built(&mut scene, "L-1", VehicleType::DE6);
    let mut engine = engine_with(config(&dir));
    let report = engine.on_world_loaded(&mut scene);
    assert_eq!(engine.registry().saved_entries().count(), 0);
    // the missing sound directory is reported, the registry problem is not fatal
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn test_one_broken_override_does_not_block_the_rest() {
    let dir = TempDir::new().unwrap();
    let sounds = dir.path().join("sounds");
    write_sound(&sounds, "horn_loop", "k5la.ogg");
    write_sound(&sounds, "bell", "ding.ogg");
    write_sound(&sounds, "bell", "cracked.ogg");

    {
        let mut scene = horn_and_bell_scene();
        let first = spawn_built(&mut scene, "L-1", VehicleType::DE6);
        let second = spawn_built(&mut scene, "L-2", VehicleType::DE6);
        let mut engine = engine_with(config(&dir));
        engine.on_world_loaded(&mut scene);
        for (loco, role, name) in [
            (first, Role::HornLoop, "k5la"),
            (first, Role::Bell, "cracked"),
            (second, Role::HornLoop, "k5la"),
            (second, Role::Bell, "ding"),
        ] {
            let definition = engine.catalog().get(&role.into(), name).cloned().unwrap();
            engine.set_override(&mut scene, loco, definition).unwrap();
        }
    }

    // the bell file turns out to be unreadable audio
    fs::write(sounds.join("bell/cracked.ogg"), b"").unwrap();

    let mut scene = horn_and_bell_scene();
    let first = spawn_built(&mut scene, "L-1", VehicleType::DE6);
    let second = spawn_built(&mut scene, "L-2", VehicleType::DE6);
    let mut engine = SoundEngine::new(config(&dir));
    let report = engine.on_world_loaded(&mut scene);

    // three catalog files plus three replayed overrides
    assert_eq!(report.succeeded, 6);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "L-1/bell");
    assert!(matches!(report.failures[0].1, SoundError::Configuration { .. }));

    let clip_of = |engine: &mut SoundEngine, scene: &AudioScene, loco: InstanceKey, role: Role| {
        let node = engine.discovery_mut().resolve(scene, loco, &role.into()).unwrap();
        layered_at(scene, node).layers[0].clip_name().map(str::to_string)
    };
    assert_eq!(clip_of(&mut engine, &scene, first, Role::HornLoop).as_deref(), Some("k5la"));
    assert_eq!(clip_of(&mut engine, &scene, first, Role::Bell).as_deref(), Some("t_bell"));
    assert_eq!(clip_of(&mut engine, &scene, second, Role::HornLoop).as_deref(), Some("k5la"));
    assert_eq!(clip_of(&mut engine, &scene, second, Role::Bell).as_deref(), Some("ding"));
}
