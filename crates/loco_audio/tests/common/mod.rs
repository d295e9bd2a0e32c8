//! Shared fixtures for the scenario tests

#![allow(dead_code)]

use loco_audio::foundation::AnimationCurve;
use loco_audio::prelude::*;
use loco_audio::scene::builder::layered;
use loco_audio::scene::NodeKey;

/// Scene with a diesel type that supports exactly the horn loop and the bell
pub fn horn_and_bell_scene() -> AudioScene {
    let mut scene = AudioScene::new();
    let mut horn = layered("Clip", &["t_horn_loop", "t_horn_reverb", "t_horn_distant"]);
    horn.layers[0].use_pitch_curve = true;
    horn.layers[0].pitch_curve = AnimationCurve::linear(0.0, 0.95, 1.0, 1.05);
    horn.layers[0].use_volume_curve = true;
    horn.layers[0].volume_curve = AnimationCurve::ease_in_out(0.0, 0.2, 1.0, 1.0);
    horn.layers[1].volume_curve = AnimationCurve::linear(0.0, 0.0, 1.0, 0.4);
    horn.layers[2].source.mute = true;

    PrefabBuilder::new(&mut scene, "DE6 Audio")
        .layered_audio("Cab/Horn", horn)
        .multi_layer("Cab/Bell", "BellAudio", &["t_bell"])
        .finish(VehicleType::DE6);
    scene
}

/// Spawn a vehicle and build its audio graph
pub fn spawn_built(scene: &mut AudioScene, identifier: &str, vehicle_type: VehicleType) -> InstanceKey {
    let loco = scene.spawn_instance(identifier, vehicle_type);
    scene.instantiate_audio(loco);
    loco
}

/// Components of every node below the vehicle's audio root, in walk order
pub fn observe(scene: &AudioScene, loco: InstanceKey) -> Vec<Option<AudioComponent>> {
    let Some(root) = scene.audio_root(loco) else {
        return Vec::new();
    };
    scene
        .walk(root, 32, true)
        .iter()
        .map(|visit| scene.component(visit.key).cloned())
        .collect()
}

/// Layered component at `node`
pub fn layered_at(scene: &AudioScene, node: NodeKey) -> loco_audio::scene::LayeredAudio {
    match scene.component(node) {
        Some(AudioComponent::MultiLayer(audio)) => audio.clone(),
        other => panic!("expected a layered object, got {other:?}"),
    }
}

/// Engine that never touches disk for clips
pub fn engine_with(config: SoundConfig) -> SoundEngine {
    SoundEngine::with_loader(config, Box::new(OpaqueClipLoader))
}
