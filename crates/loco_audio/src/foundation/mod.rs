//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Value-type animation curves
//! - Logging utilities

pub mod curve;
pub mod logging;

pub use curve::{AnimationCurve, Keyframe};
