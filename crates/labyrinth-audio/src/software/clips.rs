//! Clip metadata resolution for the software engine.
//!
//! Clips can be registered in memory (tests, scripted scenes) or loaded from
//! disk. With the `rodio_decode` feature the file is decoded to learn its
//! length and sample rate; without it the file only has to exist and its
//! length is unknown, so non-looping channels never finish on their own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use labyrinth_common::{EngineCode, EngineResult};
use tracing::debug;

/// Sample rate assumed when a clip does not report one.
pub const DEFAULT_FREQUENCY: f32 = 44_100.0;

/// What the engine knows about a sound asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    /// Length in milliseconds, if known.
    pub length_ms: Option<u32>,
    /// Native sample rate in Hz.
    pub frequency: f32,
}

impl ClipInfo {
    /// A clip of known length at the default sample rate.
    #[must_use]
    pub const fn with_length(length_ms: u32) -> Self {
        Self {
            length_ms: Some(length_ms),
            frequency: DEFAULT_FREQUENCY,
        }
    }

    /// A clip whose length is unknown.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            length_ms: None,
            frequency: DEFAULT_FREQUENCY,
        }
    }

    /// A decoded clip. A zero sample rate falls back to [`DEFAULT_FREQUENCY`].
    #[must_use]
    pub fn decoded(length_ms: u32, sample_rate: u32) -> Self {
        Self {
            length_ms: Some(length_ms),
            frequency: native_rate(sample_rate as f32),
        }
    }
}

fn native_rate(frequency: f32) -> f32 {
    if frequency.is_finite() && frequency > 0.0 {
        frequency
    } else {
        DEFAULT_FREQUENCY
    }
}

/// Registered clips keyed by resolved path.
#[derive(Debug, Default)]
pub(crate) struct ClipLibrary {
    registered: HashMap<PathBuf, ClipInfo>,
}

impl ClipLibrary {
    pub(crate) fn register(&mut self, path: PathBuf, mut info: ClipInfo) {
        debug!("Registered in-memory clip {}", path.display());
        info.frequency = native_rate(info.frequency);
        self.registered.insert(path, info);
    }

    pub(crate) fn resolve(&self, path: &Path) -> EngineResult<ClipInfo> {
        if let Some(info) = self.registered.get(path) {
            return Ok(*info);
        }
        load_from_disk(path)
    }
}

#[cfg(feature = "rodio_decode")]
fn load_from_disk(path: &Path) -> EngineResult<ClipInfo> {
    use std::io::BufReader;

    use rodio::Source;

    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EngineCode::FileNotFound,
        _ => EngineCode::Format,
    })?;
    let decoder = rodio::Decoder::new(BufReader::new(file)).map_err(|_| EngineCode::Format)?;

    let sample_rate = decoder.sample_rate();
    let channels = u64::from(decoder.channels().max(1));
    let length_ms = match decoder.total_duration() {
        Some(duration) => u32::try_from(duration.as_millis()).unwrap_or(u32::MAX),
        None => {
            let frames = decoder.count() as u64 / channels;
            u32::try_from(frames * 1000 / u64::from(sample_rate.max(1))).unwrap_or(u32::MAX)
        },
    };

    debug!("Decoded {} ({length_ms} ms @ {sample_rate} Hz)", path.display());
    Ok(ClipInfo::decoded(length_ms, sample_rate))
}

#[cfg(not(feature = "rodio_decode"))]
fn load_from_disk(path: &Path) -> EngineResult<ClipInfo> {
    if path.is_file() {
        debug!("Opened {} without decoding (length unknown)", path.display());
        Ok(ClipInfo::unbounded())
    } else {
        Err(EngineCode::FileNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_clip_wins() {
        let mut library = ClipLibrary::default();
        library.register(PathBuf::from("audio/step.wav"), ClipInfo::with_length(250));
        let info = library.resolve(Path::new("audio/step.wav")).expect("registered");
        assert_eq!(info.length_ms, Some(250));
    }

    #[test]
    fn test_zero_sample_rate_uses_default() {
        assert_eq!(ClipInfo::decoded(500, 0).frequency, DEFAULT_FREQUENCY);
        assert_eq!(ClipInfo::decoded(500, 22_050).frequency, 22_050.0);

        let mut library = ClipLibrary::default();
        let info = ClipInfo {
            length_ms: Some(100),
            frequency: 0.0,
        };
        library.register(PathBuf::from("audio/click.wav"), info);
        let resolved = library.resolve(Path::new("audio/click.wav")).expect("registered");
        assert_eq!(resolved.frequency, DEFAULT_FREQUENCY);
    }

    #[test]
    fn test_missing_file() {
        let library = ClipLibrary::default();
        assert_eq!(
            library.resolve(Path::new("does/not/exist.wav")),
            Err(EngineCode::FileNotFound)
        );
    }

    #[cfg(not(feature = "rodio_decode"))]
    #[test]
    fn test_existing_file_without_decoder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hum.wav");
        std::fs::write(&path, b"RIFF").expect("write");
        let library = ClipLibrary::default();
        assert_eq!(library.resolve(&path), Ok(ClipInfo::unbounded()));
    }
}
