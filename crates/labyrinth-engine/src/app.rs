//! Application lifecycle.
//!
//! Headless main loop: load the scene, then run frames until the configured
//! session length has elapsed or, with no length set, until the scene has
//! gone quiet. Each frame feeds the fixed-step accumulator and runs the
//! resulting number of scene ticks.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::scene::AudioScene;
use crate::scene_description::SceneDescription;
use crate::timing::FrameTiming;

/// What a finished run did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Frames executed.
    pub frames: u64,
    /// Fixed ticks executed.
    pub ticks: u64,
    /// Time covered, in seconds.
    pub elapsed_seconds: f32,
    /// Engine failures recorded by the audio system.
    pub engine_failures: u64,
}

/// Load the configured scene and run it to completion.
pub fn run(config: &EngineConfig) -> Result<RunSummary> {
    let mut desc = SceneDescription::load_from(&config.scene_path)
        .with_context(|| format!("loading scene {}", config.scene_path.display()))?;
    desc.expand_presets(config.fixed_dt());
    let scene = AudioScene::with_software_engine(config.audio.clone(), &desc)
        .with_context(|| format!("building scene '{}'", desc.name))?;
    run_scene(config, scene)
}

/// Drive an already built scene.
pub fn run_scene(config: &EngineConfig, mut scene: AudioScene) -> Result<RunSummary> {
    let mut timing = FrameTiming::new(config.target_fps)
        .with_realtime(config.realtime)
        .with_max_updates(config.max_fixed_updates);
    timing.set_fixed_dt(config.fixed_dt());
    let fixed_dt = timing.fixed_dt();

    info!(
        "Running scene '{}' at {} Hz ({})",
        scene.name(),
        config.fixed_update_hz,
        if config.realtime { "realtime" } else { "simulated" }
    );

    let mut frames = 0_u64;
    let mut elapsed = 0.0_f32;
    let mut next_report = 1.0_f32;
    timing.reset();

    loop {
        let dt = timing.delta_time();
        for _ in 0..timing.accumulate(dt) {
            scene
                .tick(fixed_dt)
                .with_context(|| format!("tick {}", scene.ticks() + 1))?;
        }
        frames += 1;
        elapsed += dt;

        if elapsed >= next_report {
            info!(
                "t={elapsed:.1}s ticks={} playing={} fps={:.0}",
                scene.ticks(),
                scene.playing_count(),
                timing.current_fps()
            );
            next_report += 1.0;
        }

        let done = if config.run_seconds > 0.0 {
            elapsed >= config.run_seconds
        } else {
            scene.ticks() > 0 && scene.is_quiet()
        };
        if done {
            break;
        }
        timing.sleep_remainder();
    }

    let summary = RunSummary {
        frames,
        ticks: scene.ticks(),
        elapsed_seconds: elapsed,
        engine_failures: scene.system().failure_count(),
    };
    debug!("{summary:?}");
    info!(
        "Scene '{}' finished after {:.2}s ({} ticks, {} engine failures)",
        scene.name(),
        summary.elapsed_seconds,
        summary.ticks,
        summary.engine_failures
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SCENE: &str = r#"
name = "app"

[[clips]]
name = "drip"
length_ms = 200

[[sounds]]
clip = "drip"
auto_play = true
"#;

    fn config(dir: &TempDir, run_seconds: f32) -> EngineConfig {
        let scene_path = dir.path().join("scene.toml");
        fs::write(&scene_path, SCENE).expect("write scene");
        EngineConfig {
            realtime: false,
            run_seconds,
            scene_path,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_runs_for_the_configured_time() {
        let dir = TempDir::new().expect("temp dir");
        let summary = run(&config(&dir, 0.5)).expect("run");
        assert!(summary.elapsed_seconds >= 0.5);
        assert!((29..=31).contains(&summary.frames), "frames = {}", summary.frames);
        assert!((23..=25).contains(&summary.ticks), "ticks = {}", summary.ticks);
        assert_eq!(summary.engine_failures, 0);
    }

    #[test]
    fn test_stops_when_the_scene_goes_quiet() {
        let dir = TempDir::new().expect("temp dir");
        let summary = run(&config(&dir, 0.0)).expect("run");
        // 200 ms clip at 50 Hz plus the auto-play tick
        assert!((10..=13).contains(&summary.ticks), "ticks = {}", summary.ticks);
    }

    #[test]
    fn test_missing_scene_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let mut config = config(&dir, 1.0);
        config.scene_path = dir.path().join("missing.toml");
        let err = run(&config).expect_err("no scene");
        assert!(err.to_string().contains("loading scene"));
    }
}
