//! End-to-end override and restore scenarios

mod common;

use approx::assert_relative_eq;
use common::{engine_with, horn_and_bell_scene, layered_at, observe, spawn_built};
use loco_audio::prelude::*;
use loco_audio::scene::builder::layered;
use loco_audio::vanilla::VanillaCache;

#[test]
fn test_horn_loop_override_then_restore() {
    let mut scene = horn_and_bell_scene();
    let loco = spawn_built(&mut scene, "L-001", VehicleType::DE6);
    let mut engine = engine_with(SoundConfig::default());

    let horn = engine
        .discovery_mut()
        .resolve(&scene, loco, &Role::HornLoop.into())
        .unwrap();
    let bell = engine
        .discovery_mut()
        .resolve(&scene, loco, &Role::Bell.into())
        .unwrap();
    let horn_before = layered_at(&scene, horn);
    let bell_before = layered_at(&scene, bell);

    let definition = OverrideDefinition::new("a", Role::HornLoop, "a.ogg").with_pitch_range(0.9, 1.0);
    engine.set_override(&mut scene, loco, definition).unwrap();

    let horn_after = layered_at(&scene, horn);
    let primary = &horn_after.layers[0];
    assert_eq!(
        primary.source.clip.as_ref().and_then(|c| c.source()),
        Some(std::path::Path::new("a.ogg"))
    );
    assert!(horn_after.layers[1..].iter().all(|l| l.source.mute));
    assert_relative_eq!(horn_after.min_pitch, 0.9);
    assert_relative_eq!(horn_after.max_pitch, 1.0);
    assert_eq!(layered_at(&scene, bell), bell_before);

    let outcome = engine
        .clear_override(&mut scene, loco, &Role::HornLoop.into())
        .unwrap();
    assert_eq!(outcome, RestoreOutcome::FromSnapshot);

    let restored = layered_at(&scene, horn);
    assert_eq!(restored.min_pitch, horn_before.min_pitch);
    assert_eq!(restored.max_pitch, horn_before.max_pitch);
    for (now, then) in restored.layers.iter().zip(&horn_before.layers) {
        assert_eq!(now.source.clip, then.source.clip);
        assert_eq!(now.source.mute, then.source.mute);
        assert_eq!(now.pitch_curve, then.pitch_curve);
        assert_eq!(now.volume_curve, then.volume_curve);
        assert_eq!(now.start_pitch, then.start_pitch);
    }
}

#[test]
fn test_restore_all_without_overrides_changes_nothing() {
    let mut scene = horn_and_bell_scene();
    let loco = spawn_built(&mut scene, "L-002", VehicleType::DE6);
    let mut engine = engine_with(SoundConfig::default());
    let before = observe(&scene, loco);

    let report = engine.restore_all(&mut scene, loco).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.succeeded, 2);
    assert!(engine.vanilla().is_empty());
    assert_eq!(observe(&scene, loco), before);

    engine.restore_all(&mut scene, loco).unwrap();
    assert_eq!(observe(&scene, loco), before);
}

#[test]
fn test_pitch_only_override_inherits_volume() {
    let mut scene = horn_and_bell_scene();
    let loco = spawn_built(&mut scene, "L-003", VehicleType::DE6);
    let mut engine = engine_with(SoundConfig::default());
    let horn = engine
        .discovery_mut()
        .resolve(&scene, loco, &Role::HornLoop.into())
        .unwrap();
    let before = layered_at(&scene, horn);

    let definition = OverrideDefinition::new("deep", Role::HornLoop, "deep.ogg").with_pitch(0.8);
    engine.set_override(&mut scene, loco, definition).unwrap();

    let after = layered_at(&scene, horn);
    assert_relative_eq!(after.layers[0].start_pitch, 0.8);
    assert_eq!(after.layers[0].volume_curve, before.layers[0].volume_curve);
    assert_eq!(after.layers[0].use_volume_curve, before.layers[0].use_volume_curve);
    assert_eq!(after.min_pitch, before.min_pitch);
    assert_eq!(after.max_pitch, before.max_pitch);
}

#[test]
fn test_unsupported_role_is_a_no_op() {
    let mut scene = horn_and_bell_scene();
    let loco = spawn_built(&mut scene, "L-004", VehicleType::DE6);
    let mut engine = engine_with(SoundConfig::default());
    let before = observe(&scene, loco);

    let whistle = OverrideDefinition::new("w", Role::Whistle, "w.ogg");
    let err = engine
        .apply(&mut scene, loco, &Role::Whistle.into(), Some(&whistle))
        .unwrap_err();
    assert!(err.is_not_found());
    let outcome = engine
        .restore_role(&mut scene, loco, &Role::Whistle.into())
        .unwrap();
    assert_eq!(outcome, RestoreOutcome::Unsupported);

    assert_eq!(observe(&scene, loco), before);
    assert!(engine.vanilla().is_empty());
}

#[test]
fn test_repeated_capture_keeps_first_state() {
    let mut scene = horn_and_bell_scene();
    let loco = spawn_built(&mut scene, "L-005", VehicleType::DE6);
    let mut engine = engine_with(SoundConfig::default());
    let key = SoundKey::Role(Role::Bell);

    // capture, then a direct edit, then capture again
    let bell = engine.apply(&mut scene, loco, &key, None).unwrap();
    let first = engine.vanilla().get(loco, &key).cloned();
    if let Some(AudioComponent::MultiLayer(audio)) = scene.component_mut(bell) {
        audio.max_pitch = 4.0;
    }
    for _ in 0..3 {
        engine.apply(&mut scene, loco, &key, None).unwrap();
    }
    assert_eq!(engine.vanilla().get(loco, &key).cloned(), first);

    let mut standalone = VanillaCache::new();
    let component = scene.component(bell).cloned().unwrap();
    assert!(standalone.capture_if_absent(loco, &key, &component));
    assert!(!standalone.capture_if_absent(loco, &key, &component));
}

#[test]
fn test_chained_overrides_restore_to_first_vanilla() {
    let mut scene = horn_and_bell_scene();
    let loco = spawn_built(&mut scene, "L-006", VehicleType::DE6);
    let mut engine = engine_with(SoundConfig::default());
    let bell = engine
        .discovery_mut()
        .resolve(&scene, loco, &Role::Bell.into())
        .unwrap();
    let before = layered_at(&scene, bell);

    for (name, file) in [("one", "one.ogg"), ("two", "two.ogg"), ("three", "three.ogg")] {
        let definition = OverrideDefinition::new(name, Role::Bell, file).with_pitch(1.25);
        engine.set_override(&mut scene, loco, definition).unwrap();
    }
    assert_eq!(
        layered_at(&scene, bell).layers[0].clip_name(),
        Some("three")
    );

    engine.reset_instance(&mut scene, loco).unwrap();
    let after = layered_at(&scene, bell);
    assert_eq!(after.layers[0].source.clip, before.layers[0].source.clip);
    assert_eq!(after.layers[0].start_pitch, before.layers[0].start_pitch);
}

#[test]
fn test_clip_set_round_trip() {
    let mut scene = AudioScene::new();
    PrefabBuilder::new(&mut scene, "DM3 Audio")
        .clip_set("Horn/Hits", "HornHit", &["dm3_hit_1", "dm3_hit_2", "dm3_hit_3"])
        .clip_set("Gearbox", "GearShift", &["dm3_gear"])
        .finish(VehicleType::DM3);
    let loco = spawn_built(&mut scene, "M-1", VehicleType::DM3);
    let mut engine = engine_with(SoundConfig::default());
    let before = observe(&scene, loco);

    let hits = OverrideDefinition::new("airchime", Role::HornHit, "chime_a.ogg")
        .with_file("chime_b.ogg")
        .with_volume_range(0.1, 0.5);
    engine.set_override(&mut scene, loco, hits).unwrap();
    let gear = OverrideDefinition::new("clunk", Role::GearShift, "clunk.wav");
    engine.set_override(&mut scene, loco, gear).unwrap();
    assert_ne!(observe(&scene, loco), before);

    let report = engine.reset_instance(&mut scene, loco).unwrap();
    assert!(report.is_clean());
    assert_eq!(observe(&scene, loco), before);
}

#[test]
fn test_live_scanned_type_restores_after_world_reload() {
    let mut scene = AudioScene::new();
    let loco = scene.spawn_instance("C-7", VehicleType::Custom("CCL".into()));
    let root = scene.add_node(None, "Audio", None);
    let slot = scene.add_node(
        Some(root),
        "Slot1",
        Some(AudioComponent::MultiLayer(layered("Clip", &["ccl_bell"]))),
    );
    scene.attach_audio(loco, root);
    let mut engine = engine_with(SoundConfig::default());

    let definition = OverrideDefinition::new("ding", Role::Bell, "ding.ogg");
    engine.set_override(&mut scene, loco, definition).unwrap();
    assert_eq!(layered_at(&scene, slot).layers[0].clip_name(), Some("ding"));

    engine.on_world_loaded(&mut scene);
    let outcome = engine
        .restore_role(&mut scene, loco, &Role::Bell.into())
        .unwrap();
    assert_eq!(outcome, RestoreOutcome::FromSnapshot);
    assert_eq!(layered_at(&scene, slot).layers[0].clip_name(), Some("ccl_bell"));
}
