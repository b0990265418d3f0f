//! Error types for the Labyrinth audio stack.

use std::path::PathBuf;

use thiserror::Error;

/// Result codes reported by the low-level audio engine.
///
/// Every backend call returns one of these on failure. Most are logged by the
/// facade and otherwise ignored. [`EngineCode::InvalidHandle`] on a dead
/// channel is the expected outcome of the engine recycling it and is routed to
/// channel replacement instead; on any other object it is a real failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum EngineCode {
    /// The handle refers to an object that no longer exists.
    #[error("invalid handle")]
    InvalidHandle,

    /// A parameter was out of range or otherwise unusable.
    #[error("invalid parameter")]
    InvalidParam,

    /// The requested file could not be found.
    #[error("file not found")]
    FileNotFound,

    /// The file exists but could not be decoded.
    #[error("unsupported or corrupt format")]
    Format,

    /// No channel slot could be allocated.
    #[error("channel allocation failed")]
    ChannelAlloc,

    /// A geometry object has no room left for another polygon or vertex.
    #[error("geometry capacity exceeded")]
    GeometryFull,

    /// The object cannot service the call in its current state.
    #[error("operation not allowed in current state")]
    NotReady,
}

impl EngineCode {
    /// Whether this code, reported for a channel handle, is an expected
    /// outcome of channel recycling.
    #[must_use]
    pub const fn is_benign(self) -> bool {
        matches!(self, Self::InvalidHandle)
    }
}

/// Result type for raw backend calls.
pub type EngineResult<T> = Result<T, EngineCode>;

/// Errors raised by the audio components.
#[derive(Debug, Error)]
pub enum AudioError {
    /// A backend call failed with a non-benign code.
    #[error("audio engine call failed: {0}")]
    EngineCall(EngineCode),

    /// The channel behind a handle no longer exists.
    #[error("channel no longer exists")]
    ChannelInvalidated,

    /// A sound asset could not be located or decoded.
    #[error("failed to load sound '{name}' from {path}: {code}")]
    ResourceLoad {
        /// Logical sound name.
        name: String,
        /// Resolved asset path.
        path: PathBuf,
        /// Code reported by the engine.
        code: EngineCode,
    },

    /// The engine has no channel slot left.
    #[error("no free channel slots")]
    EngineResourceExhausted,

    /// Geometry faces do not match the declared capacity.
    #[error(
        "geometry capacity mismatch: declared {declared_polygons} polygons / {declared_vertices} vertices, got {polygons} / {vertices}"
    )]
    CapacityMismatch {
        /// Polygons declared at creation.
        declared_polygons: usize,
        /// Vertices declared at creation.
        declared_vertices: usize,
        /// Polygons supplied.
        polygons: usize,
        /// Vertices supplied.
        vertices: usize,
    },

    /// Reverb falloff radii are inconsistent.
    #[error("invalid reverb radii: min {min} must be within 0..={max}")]
    InvalidRadii {
        /// Inner radius.
        min: f32,
        /// Outer radius.
        max: f32,
    },
}

impl From<EngineCode> for AudioError {
    fn from(code: EngineCode) -> Self {
        Self::EngineCall(code)
    }
}

/// Result type alias for audio component operations.
pub type AudioResult<T> = Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_handle_is_benign() {
        assert!(EngineCode::InvalidHandle.is_benign());
        assert!(!EngineCode::ChannelAlloc.is_benign());
        assert!(!EngineCode::InvalidParam.is_benign());
    }

    #[test]
    fn test_engine_code_conversion() {
        assert!(matches!(
            AudioError::from(EngineCode::InvalidHandle),
            AudioError::EngineCall(EngineCode::InvalidHandle)
        ));
        assert!(matches!(
            AudioError::from(EngineCode::Format),
            AudioError::EngineCall(EngineCode::Format)
        ));
    }

    #[test]
    fn test_error_display() {
        let err = AudioError::CapacityMismatch {
            declared_polygons: 2,
            declared_vertices: 6,
            polygons: 3,
            vertices: 9,
        };
        let text = err.to_string();
        assert!(text.contains("2 polygons"));
        assert!(text.contains("3 / 9"));

        let err = AudioError::InvalidRadii { min: 5.0, max: 1.0 };
        assert!(err.to_string().contains("min 5"));
    }
}
