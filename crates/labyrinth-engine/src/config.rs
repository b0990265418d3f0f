//! Engine configuration.
//!
//! Frame pacing, session length, the scene to load and the audio system
//! settings. Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use labyrinth_audio::AudioConfig;

/// Configuration file name.
pub const CONFIG_FILE: &str = "labyrinth.toml";

/// Default scene description.
pub const DEFAULT_SCENE: &str = "scenes/maze.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Timing ===
    /// Target frames per second
    pub target_fps: u32,
    /// Fixed updates per second
    pub fixed_update_hz: u32,
    /// Upper bound on fixed updates run in one frame
    pub max_fixed_updates: u32,
    /// Sleep to hold the frame rate; when off, frames are simulated back to back
    pub realtime: bool,

    // === Session ===
    /// Seconds of simulated time to run (0 = until every sound has finished)
    pub run_seconds: f32,
    /// Scene description to load
    pub scene_path: PathBuf,

    // === Audio ===
    /// Audio system settings
    pub audio: AudioConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Timing
            target_fps: 60,
            fixed_update_hz: 50,
            max_fixed_updates: 10,
            realtime: true,

            // Session
            run_seconds: 10.0,
            scene_path: PathBuf::from(DEFAULT_SCENE),

            // Audio
            audio: AudioConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the working directory.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(mut config) => {
                        info!("Loaded config from {}", path.display());
                        config.validate();
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Timing
        self.target_fps = self.target_fps.clamp(1, 240);
        self.fixed_update_hz = self.fixed_update_hz.clamp(10, 240);
        self.max_fixed_updates = self.max_fixed_updates.clamp(1, 100);

        // Session
        if !self.run_seconds.is_finite() {
            self.run_seconds = 0.0;
        }
        self.run_seconds = self.run_seconds.clamp(0.0, 3600.0);

        // Audio
        self.audio.max_channels = self.audio.max_channels.clamp(1, 4096);
        self.audio.doppler_scale = self.audio.doppler_scale.max(0.0);
        self.audio.distance_factor = self.audio.distance_factor.max(0.001);
        self.audio.rolloff_scale = self.audio.rolloff_scale.max(0.0);
    }

    /// Fixed timestep in seconds.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.fixed_update_hz.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.fixed_update_hz, 50);
        assert!((config.fixed_dt() - 0.02).abs() < 1e-6);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.fixed_update_hz = 1;
        config.run_seconds = f32::NAN;
        config.audio.max_channels = 0;
        config.audio.distance_factor = 0.0;

        config.validate();

        assert_eq!(config.fixed_update_hz, 10);
        assert_eq!(config.run_seconds, 0.0);
        assert_eq!(config.audio.max_channels, 1);
        assert!(config.audio.distance_factor > 0.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("labyrinth.toml");

        let mut config = EngineConfig::default();
        config.run_seconds = 2.5;
        config.realtime = false;
        config.audio.max_channels = 8;
        config.audio.steal_channels = false;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/labyrinth.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("labyrinth.toml");
        fs::write(&config_path, "run_seconds = 3.0\n\n[audio]\nmax_channels = 4\n")
            .expect("write config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.run_seconds, 3.0);
        assert_eq!(loaded.audio.max_channels, 4);
        assert!(loaded.audio.steal_channels);
        assert_eq!(loaded.target_fps, 60);
    }

    #[test]
    fn test_garbage_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("labyrinth.toml");
        fs::write(&config_path, "target_fps = \"fast\"").expect("write config");

        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
    }
}
