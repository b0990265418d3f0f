//! World transform snapshots read from the host scene graph.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A read-only view of an object's world transform for one tick.
///
/// The audio layer never writes these back; the host refreshes them before
/// each fixed update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// World position.
    pub position: Vec3,
    /// Forward basis vector (unit length).
    pub forward: Vec3,
    /// Up basis vector (unit length).
    pub up: Vec3,
    /// Accumulated world scale.
    pub lossy_scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
            lossy_scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates an identity-oriented transform at a position.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Returns a copy with a new orientation; both vectors are normalized.
    #[must_use]
    pub fn with_orientation(mut self, forward: Vec3, up: Vec3) -> Self {
        self.forward = forward.normalize_or_zero();
        self.up = up.normalize_or_zero();
        self
    }

    /// Returns a copy with a new scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: Vec3) -> Self {
        self.lossy_scale = scale;
        self
    }

    /// Right basis vector derived from `up` and `forward` (left-handed, +X right).
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.up.cross(self.forward)
    }
}
