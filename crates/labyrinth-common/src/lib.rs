//! # Labyrinth Common
//!
//! Shared types for the Labyrinth audio stack.
//!
//! This crate provides the foundations used by the audio layer and the
//! engine binary:
//! - Engine result codes and the audio error taxonomy
//! - Generational handle types for engine-side objects
//! - Transform snapshots read from the host scene graph
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod transform;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::transform::*;
}

pub use prelude::*;
