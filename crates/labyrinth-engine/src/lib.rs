//! # Labyrinth Engine
//!
//! Headless runner for Labyrinth scenes.
//!
//! This crate ties the audio components to a frame loop:
//! - Config: TOML engine and audio settings
//! - Timing: frame pacing and the fixed-step accumulator
//! - Scenes: TOML descriptions and the composition root that owns every
//!   audio object and ticks them in order
//! - Interaction: doors and other things the listener can use

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod config;
pub mod interaction;
pub mod scene;
pub mod scene_description;
pub mod scheduler;
pub mod timing;

pub use config::EngineConfig;
pub use scene::AudioScene;
pub use scene_description::{SceneDescription, SceneError};
