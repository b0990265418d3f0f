//! # Labyrinth Audio
//!
//! Channel lifecycle and 3D acoustic geometry on top of a low-level,
//! handle-based audio engine.
//!
//! This crate provides:
//! - [`AudioBackend`]: the engine interface (sounds, channels, groups, DSP,
//!   occlusion geometry, reverb regions)
//! - [`SoftwareEngine`]: an in-process engine with a bounded channel pool,
//!   playback clocks and line-of-sight occlusion
//! - [`AudioSystem`]: the facade every component goes through, with a single
//!   result-check point
//! - [`Sound3D`]: positional sounds that survive channel invalidation
//! - [`SoundGroup3D`], [`AcousticGeometry`], [`ReverbZone`]
//!
//! ## Channel invalidation
//!
//! The engine owns a fixed pool of channels and may reclaim any of them: a
//! clip ends, a sound is stopped, or a newer sound steals the oldest slot.
//! Handles are generational, so a reclaimed handle fails with
//! `EngineCode::InvalidHandle` instead of addressing someone else's channel.
//! That code is benign: the facade neither logs nor counts it, and
//! [`Sound3D`] answers it by acquiring a replacement channel.
//!
//! ## Features
//!
//! - `rodio_decode`: decode assets from disk with rodio to learn their length
//!   and sample rate. Without it, on-disk assets are only checked for
//!   existence.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod dsp;
pub mod geometry;
pub mod group;
pub mod presets;
pub mod reverb;
pub mod software;
pub mod sound;
pub mod system;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::dsp::DspType;
    pub use crate::geometry::*;
    pub use crate::group::*;
    pub use crate::presets::*;
    pub use crate::reverb::*;
    pub use crate::software::{ClipInfo, SoftwareConfig, SoftwareEngine};
    pub use crate::sound::*;
    pub use crate::system::*;
}

pub use prelude::*;
