//! Audio feature hand-off to effects.
//!
//! This module provides:
//! - The per-tick feature summary produced by an external analysis pipeline
//! - Fan-out of those frames to every subscribed effect
//! - A synthetic beat generator standing in for live analysis

pub mod bus;
pub mod features;
pub mod synth;

// Re-export commonly used types
pub use bus::AudioBus;
pub use features::{BandPower, FeatureFrame};
pub use synth::FeatureSynth;
