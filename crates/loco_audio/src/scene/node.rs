//! Audio components attached to scene nodes
//!
//! Two audio-bearing shapes exist: [`LayeredAudio`] (several independently
//! pitched and voiced layers driven by curves) and [`ClipSet`] (a flat array
//! of interchangeable one-shot clips). A [`AudioComponent::ChuffController`]
//! marks the root of a steam chuff sub-structure.

use rand::Rng;

use super::clip::Clip;
use super::NodeKey;
use crate::catalog::Shape;
use crate::foundation::curve::AnimationCurve;

/// Playback state of one layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSource {
    /// Clip assigned to this layer
    pub clip: Option<Clip>,
    /// Muted layers keep running but are silent
    pub mute: bool,
    /// Whether the layer is currently playing
    pub is_playing: bool,
    /// Playback position in seconds
    pub time: f32,
    /// Pitch computed by the last update
    pub pitch: f32,
    /// Volume computed by the last update
    pub volume: f32,
}

impl LayerSource {
    /// Idle source holding `clip`
    pub fn new(clip: Option<Clip>) -> Self {
        Self {
            clip,
            mute: false,
            is_playing: false,
            time: 0.0,
            pitch: 1.0,
            volume: 0.0,
        }
    }

    /// Stop playback and rewind
    pub fn stop(&mut self) {
        self.is_playing = false;
        self.time = 0.0;
    }
}

/// One layer of a [`LayeredAudio`]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioLayer {
    /// Layer name
    pub name: String,
    /// Playback state
    pub source: LayerSource,
    /// Pitch multiplier applied before the curve
    pub start_pitch: f32,
    /// Pitch as a function of the driving parameter
    pub pitch_curve: AnimationCurve,
    /// Volume as a function of the driving parameter
    pub volume_curve: AnimationCurve,
    /// Whether `pitch_curve` is evaluated
    pub use_pitch_curve: bool,
    /// Whether `volume_curve` is evaluated
    pub use_volume_curve: bool,
    /// Start playback at a random position
    pub randomize_start_time: bool,
    /// Volume smoothing factor in `[0, 1)`; 0 follows the curve instantly
    pub inertia: f32,
}

impl AudioLayer {
    /// Layer with flat curves
    pub fn new(name: impl Into<String>, clip: Option<Clip>) -> Self {
        Self {
            name: name.into(),
            source: LayerSource::new(clip),
            start_pitch: 1.0,
            pitch_curve: AnimationCurve::constant(1.0),
            volume_curve: AnimationCurve::constant(1.0),
            use_pitch_curve: false,
            use_volume_curve: false,
            randomize_start_time: false,
            inertia: 0.0,
        }
    }

    /// Name of the clip currently assigned, if any
    pub fn clip_name(&self) -> Option<&str> {
        self.source.clip.as_ref().map(Clip::name)
    }
}

/// Memoised playback state, derived from the layers and the last input
#[derive(Debug, Clone, Default, PartialEq)]
struct PlaybackMemo {
    last_param: Option<f32>,
    smoothed_volume: Vec<f32>,
}

/// Multi-layer audio object with a shared pitch range
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredAudio {
    /// Object identifier (often a meaningless placeholder such as "Clip")
    pub name: String,
    /// Ordered layers; layer 0 is the primary layer
    pub layers: Vec<AudioLayer>,
    /// Lower pitch bound shared by every layer
    pub min_pitch: f32,
    /// Upper pitch bound shared by every layer
    pub max_pitch: f32,
    memo: PlaybackMemo,
}

impl LayeredAudio {
    /// Create an object with the default `[0.5, 2.0]` pitch range
    pub fn new(name: impl Into<String>, layers: Vec<AudioLayer>) -> Self {
        Self {
            name: name.into(),
            layers,
            min_pitch: 0.5,
            max_pitch: 2.0,
            memo: PlaybackMemo::default(),
        }
    }

    /// Set the shared pitch range
    pub fn with_pitch_range(mut self, min_pitch: f32, max_pitch: f32) -> Self {
        self.min_pitch = min_pitch;
        self.max_pitch = max_pitch;
        self
    }

    /// Primary layer
    pub fn primary(&self) -> Option<&AudioLayer> {
        self.layers.first()
    }

    /// Primary layer, mutably
    pub fn primary_mut(&mut self) -> Option<&mut AudioLayer> {
        self.layers.first_mut()
    }

    /// Whether any layer is playing
    pub fn is_playing(&self) -> bool {
        self.layers.iter().any(|l| l.source.is_playing)
    }

    /// Start the primary layer
    pub fn play<R: Rng>(&mut self, rng: &mut R) {
        if let Some(primary) = self.layers.first_mut() {
            let length = primary.source.clip.as_ref().map_or(0.0, Clip::length_secs);
            primary.source.time = if primary.randomize_start_time && length > 0.0 {
                rng.gen_range(0.0..length)
            } else {
                0.0
            };
            primary.source.is_playing = true;
        }
    }

    /// Stop every layer
    pub fn stop(&mut self) {
        for layer in &mut self.layers {
            layer.source.stop();
        }
    }

    /// Parameter value seen by the last [`update`](Self::update)
    pub fn last_param(&self) -> Option<f32> {
        self.memo.last_param
    }

    /// Evaluate every layer's curves for the driving parameter
    ///
    /// Volume is smoothed against the previous update using each layer's
    /// inertia; pitch is clamped to the shared range.
    pub fn update(&mut self, param: f32) {
        let (lo, hi) = if self.min_pitch <= self.max_pitch {
            (self.min_pitch, self.max_pitch)
        } else {
            (self.max_pitch, self.min_pitch)
        };
        self.memo.smoothed_volume.resize(self.layers.len(), f32::NAN);

        for (layer, smoothed) in self.layers.iter_mut().zip(self.memo.smoothed_volume.iter_mut()) {
            let curve_pitch = if layer.use_pitch_curve {
                layer.pitch_curve.evaluate(param)
            } else {
                1.0
            };
            layer.source.pitch = (layer.start_pitch * curve_pitch).clamp(lo, hi);

            let target = if layer.use_volume_curve {
                layer.volume_curve.evaluate(param)
            } else {
                1.0
            };
            let volume = if smoothed.is_nan() {
                target
            } else {
                *smoothed + (target - *smoothed) * (1.0 - layer.inertia.clamp(0.0, 0.99))
            };
            *smoothed = volume;
            layer.source.volume = if layer.source.mute { 0.0 } else { volume };
        }
        self.memo.last_param = Some(param);
    }

    /// Discard every derived playback value
    pub fn reset(&mut self) {
        self.memo = PlaybackMemo::default();
        for layer in &mut self.layers {
            layer.source.pitch = layer.start_pitch;
            layer.source.volume = 0.0;
            layer.source.time = 0.0;
        }
    }
}

/// Flat array of interchangeable clips
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSet {
    /// Object identifier
    pub name: String,
    /// Clips picked from on every trigger
    pub clips: Vec<Clip>,
    /// Whether a clip is currently playing
    pub is_playing: bool,
    last_played: Option<usize>,
}

impl ClipSet {
    /// Create a clip set
    pub fn new(name: impl Into<String>, clips: Vec<Clip>) -> Self {
        Self {
            name: name.into(),
            clips,
            is_playing: false,
            last_played: None,
        }
    }

    /// Pick the next clip, avoiding an immediate repeat when possible
    pub fn pick<R: Rng>(&mut self, rng: &mut R) -> Option<&Clip> {
        let index = match self.clips.len() {
            0 => return None,
            1 => 0,
            len => {
                let mut index = rng.gen_range(0..len);
                if Some(index) == self.last_played {
                    index = (index + 1) % len;
                }
                index
            }
        };
        self.last_played = Some(index);
        self.clips.get(index)
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.is_playing = false;
    }

    /// Forget the round-robin position
    pub fn reset(&mut self) {
        self.last_played = None;
    }
}

/// Audio behaviour attached to a scene node
#[derive(Debug, Clone, PartialEq)]
pub enum AudioComponent {
    /// Multi-layer object
    MultiLayer(LayeredAudio),
    /// Clip array object
    ClipSet(ClipSet),
    /// Root of a steam chuff sub-structure; its subtree holds one
    /// multi-layer object per firing-frequency band
    ChuffController,
}

impl AudioComponent {
    /// Shape of the audio-bearing component, `None` for controllers
    pub fn shape(&self) -> Option<Shape> {
        match self {
            Self::MultiLayer(_) => Some(Shape::MultiLayer),
            Self::ClipSet(_) => Some(Shape::ClipSet),
            Self::ChuffController => None,
        }
    }

    /// Object identifier of the audio-bearing component
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::MultiLayer(audio) => Some(&audio.name),
            Self::ClipSet(set) => Some(&set.name),
            Self::ChuffController => None,
        }
    }

    /// Names of the clips currently attached, primary first
    pub fn clip_names(&self) -> Vec<&str> {
        match self {
            Self::MultiLayer(audio) => audio.layers.iter().filter_map(AudioLayer::clip_name).collect(),
            Self::ClipSet(set) => set.clips.iter().map(Clip::name).collect(),
            Self::ChuffController => Vec::new(),
        }
    }

    /// Whether anything is playing
    pub fn is_playing(&self) -> bool {
        match self {
            Self::MultiLayer(audio) => audio.is_playing(),
            Self::ClipSet(set) => set.is_playing,
            Self::ChuffController => false,
        }
    }

    /// Stop playback
    pub fn stop(&mut self) {
        match self {
            Self::MultiLayer(audio) => audio.stop(),
            Self::ClipSet(set) => set.stop(),
            Self::ChuffController => {}
        }
    }

    /// Structural reset: drop memoised playback state
    pub fn reset(&mut self) {
        match self {
            Self::MultiLayer(audio) => audio.reset(),
            Self::ClipSet(set) => set.reset(),
            Self::ChuffController => {}
        }
    }
}

/// Node of the audio scene graph
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Name of the node (the game-object name)
    pub name: String,
    /// Parent node, `None` for roots
    pub parent: Option<NodeKey>,
    /// Child nodes in insertion order
    pub children: Vec<NodeKey>,
    /// Audio behaviour, if any
    pub component: Option<AudioComponent>,
}

impl SceneNode {
    /// Shape of the attached audio object, if any
    pub fn shape(&self) -> Option<Shape> {
        self.component.as_ref().and_then(AudioComponent::shape)
    }

    /// Whether this node roots a chuff sub-structure
    pub fn is_chuff_controller(&self) -> bool {
        matches!(self.component, Some(AudioComponent::ChuffController))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine_loop() -> LayeredAudio {
        let mut layer = AudioLayer::new("main", Some(Clip::named("idle").with_length(4.0)));
        layer.use_pitch_curve = true;
        layer.pitch_curve = AnimationCurve::linear(0.0, 1.0, 1.0, 3.0);
        layer.use_volume_curve = true;
        layer.volume_curve = AnimationCurve::linear(0.0, 0.0, 1.0, 1.0);
        LayeredAudio::new("Clip", vec![layer, AudioLayer::new("sub", None)]).with_pitch_range(0.8, 2.0)
    }

    #[test]
    fn test_update_clamps_pitch() {
        let mut audio = engine_loop();
        audio.update(1.0);
        assert_relative_eq!(audio.layers[0].source.pitch, 2.0);
        assert_relative_eq!(audio.layers[0].source.volume, 1.0);
        assert_eq!(audio.last_param(), Some(1.0));
    }

    #[test]
    fn test_update_with_nan_param() {
        let mut audio = engine_loop();
        audio.update(f32::NAN);
        assert_relative_eq!(audio.layers[0].source.pitch, 1.0);
        assert_relative_eq!(audio.layers[0].source.volume, 0.0);
    }

    #[test]
    fn test_inertia_smooths_volume() {
        let mut audio = engine_loop();
        audio.layers[0].inertia = 0.5;
        audio.update(0.0);
        audio.update(1.0);
        assert_relative_eq!(audio.layers[0].source.volume, 0.5);
    }

    #[test]
    fn test_reset_discards_memo() {
        let mut audio = engine_loop();
        audio.layers[0].inertia = 0.5;
        audio.update(0.0);
        audio.reset();
        assert_eq!(audio.last_param(), None);
        audio.update(1.0);
        // no stale smoothing after a reset
        assert_relative_eq!(audio.layers[0].source.volume, 1.0);
    }

    #[test]
    fn test_muted_layer_is_silent() {
        let mut audio = engine_loop();
        audio.layers[0].source.mute = true;
        audio.update(1.0);
        assert_eq!(audio.layers[0].source.volume, 0.0);
    }

    #[test]
    fn test_play_randomizes_start() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut audio = engine_loop();
        audio.layers[0].randomize_start_time = true;
        audio.play(&mut rng);
        assert!(audio.is_playing());
        assert!(audio.layers[0].source.time < 4.0);

        audio.stop();
        assert!(!audio.is_playing());
        assert_eq!(audio.layers[0].source.time, 0.0);
    }

    #[test]
    fn test_clip_set_pick_avoids_repeat() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut set = ClipSet::new("hits", vec![Clip::named("a"), Clip::named("b")]);
        let first = set.pick(&mut rng).unwrap().name().to_string();
        let second = set.pick(&mut rng).unwrap().name().to_string();
        assert_ne!(first, second);

        let mut empty = ClipSet::new("none", Vec::new());
        assert!(empty.pick(&mut rng).is_none());
    }

    #[test]
    fn test_component_accessors() {
        let component = AudioComponent::MultiLayer(engine_loop());
        assert_eq!(component.shape(), Some(Shape::MultiLayer));
        assert_eq!(component.name(), Some("Clip"));
        assert_eq!(component.clip_names(), vec!["idle"]);
        assert_eq!(AudioComponent::ChuffController.shape(), None);
    }
}
