//! Animation curves
//!
//! Curves are plain values: cloning one produces an independent deep copy,
//! which is what lets a vanilla snapshot survive later edits to the live
//! object's curve.

use serde::{Deserialize, Serialize};

/// Single key of an [`AnimationCurve`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Input position of the key
    pub time: f32,
    /// Output value at `time`
    pub value: f32,
    /// Incoming slope
    #[serde(default)]
    pub in_tangent: f32,
    /// Outgoing slope
    #[serde(default)]
    pub out_tangent: f32,
}

impl Keyframe {
    /// Create a key with flat tangents
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }

    /// Create a key with explicit tangents
    pub fn with_tangents(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
        }
    }
}

/// Piecewise cubic Hermite curve over sorted keyframes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct AnimationCurve {
    keys: Vec<Keyframe>,
}

impl AnimationCurve {
    /// Build a curve, sorting the keys by time
    pub fn new(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Curve that always evaluates to `value`
    pub fn constant(value: f32) -> Self {
        Self::new(vec![Keyframe::new(0.0, value)])
    }

    /// Straight line between two keys
    pub fn linear(time_start: f32, value_start: f32, time_end: f32, value_end: f32) -> Self {
        if (time_end - time_start).abs() <= f32::EPSILON {
            return Self::constant(value_start);
        }
        let slope = (value_end - value_start) / (time_end - time_start);
        Self::new(vec![
            Keyframe::with_tangents(time_start, value_start, slope, slope),
            Keyframe::with_tangents(time_end, value_end, slope, slope),
        ])
    }

    /// S-shaped curve with flat tangents at both ends
    pub fn ease_in_out(time_start: f32, value_start: f32, time_end: f32, value_end: f32) -> Self {
        Self::new(vec![
            Keyframe::new(time_start, value_start),
            Keyframe::new(time_end, value_end),
        ])
    }

    /// The keys, sorted by time
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Whether the curve has no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// First key, if any
    pub fn first(&self) -> Option<&Keyframe> {
        self.keys.first()
    }

    /// Last key, if any
    pub fn last(&self) -> Option<&Keyframe> {
        self.keys.last()
    }

    /// Evaluate the curve at `time`, clamping outside the key range
    ///
    /// A NaN `time` evaluates to the first key's value.
    pub fn evaluate(&self, time: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if time.is_nan() || time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        // keys are sorted, so the first key past `time` closes the segment
        let upper = self.keys.partition_point(|k| k.time <= time);
        let k0 = &self.keys[upper - 1];
        let k1 = &self.keys[upper];
        hermite(k0, k1, time)
    }

    /// Ease-in/ease-out between the original first/last key times and new end values
    ///
    /// A missing bound keeps the curve's current value at that end. Returns
    /// `None` for an empty curve, since there are no key times to keep.
    pub fn reshaped(&self, value_start: Option<f32>, value_end: Option<f32>) -> Option<Self> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        Some(Self::ease_in_out(
            first.time,
            value_start.unwrap_or(first.value),
            last.time,
            value_end.unwrap_or(last.value),
        ))
    }
}

impl From<Vec<Keyframe>> for AnimationCurve {
    fn from(keys: Vec<Keyframe>) -> Self {
        Self::new(keys)
    }
}

impl From<AnimationCurve> for Vec<Keyframe> {
    fn from(curve: AnimationCurve) -> Self {
        curve.keys
    }
}

fn hermite(k0: &Keyframe, k1: &Keyframe, time: f32) -> f32 {
    let dt = k1.time - k0.time;
    if dt <= f32::EPSILON {
        return k1.value;
    }
    let s = (time - k0.time) / dt;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    h00 * k0.value + h10 * dt * k0.out_tangent + h01 * k1.value + h11 * dt * k1.in_tangent
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_curve() {
        let curve = AnimationCurve::default();
        assert_eq!(curve.evaluate(0.5), 0.0);
        assert!(curve.reshaped(Some(1.0), None).is_none());
    }

    #[test]
    fn test_clamped_ends() {
        let curve = AnimationCurve::linear(0.0, 1.0, 1.0, 2.0);
        assert_relative_eq!(curve.evaluate(-1.0), 1.0);
        assert_relative_eq!(curve.evaluate(5.0), 2.0);
    }

    #[test]
    fn test_nan_time_clamps_to_first_key() {
        let curve = AnimationCurve::linear(0.0, 0.25, 1.0, 1.0);
        assert_relative_eq!(curve.evaluate(f32::NAN), 0.25);

        let three = AnimationCurve::new(vec![
            Keyframe::new(0.0, 1.0),
            Keyframe::new(0.5, 2.0),
            Keyframe::new(1.0, 3.0),
        ]);
        assert_relative_eq!(three.evaluate(f32::NAN), 1.0);
    }

    #[test]
    fn test_linear_midpoint() {
        let curve = AnimationCurve::linear(0.0, 0.0, 2.0, 4.0);
        assert_relative_eq!(curve.evaluate(1.0), 2.0, epsilon = 1e-5);
        assert_relative_eq!(curve.evaluate(0.5), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let curve = AnimationCurve::ease_in_out(0.0, 0.0, 1.0, 1.0);
        assert_relative_eq!(curve.evaluate(0.5), 0.5, epsilon = 1e-5);
        // flat tangents: slow start
        assert!(curve.evaluate(0.1) < 0.1);
    }

    #[test]
    fn test_keys_are_sorted() {
        let curve = AnimationCurve::new(vec![Keyframe::new(1.0, 5.0), Keyframe::new(0.0, 3.0)]);
        assert_eq!(curve.first().unwrap().time, 0.0);
        assert_eq!(curve.last().unwrap().value, 5.0);
    }

    #[test]
    fn test_reshape_keeps_key_times() {
        let curve = AnimationCurve::new(vec![
            Keyframe::new(0.2, 0.5),
            Keyframe::new(0.6, 0.9),
            Keyframe::new(0.8, 1.2),
        ]);
        let reshaped = curve.reshaped(Some(0.7), None).unwrap();
        assert_eq!(reshaped.keys().len(), 2);
        assert_relative_eq!(reshaped.first().unwrap().time, 0.2);
        assert_relative_eq!(reshaped.first().unwrap().value, 0.7);
        assert_relative_eq!(reshaped.last().unwrap().time, 0.8);
        assert_relative_eq!(reshaped.last().unwrap().value, 1.2);
    }

    #[test]
    fn test_clone_is_deep() {
        let original = AnimationCurve::linear(0.0, 0.0, 1.0, 1.0);
        let mut copy = original.clone();
        copy = copy.reshaped(Some(3.0), Some(4.0)).unwrap();
        assert_ne!(original, copy);
        assert_relative_eq!(original.evaluate(1.0), 1.0);
    }
}
