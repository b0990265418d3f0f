//! Frame timing.
//!
//! Provides delta time per frame, a fixed timestep accumulator for the audio
//! tick and frame rate limiting. Headless runs can simulate frames back to
//! back instead of measuring the wall clock.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frame timing manager.
#[derive(Debug)]
pub struct FrameTiming {
    /// Target frames per second
    target_fps: u32,
    /// Time budget per frame
    frame_budget: Duration,
    /// Time of last frame start
    last_frame: Instant,
    /// Accumulator for fixed timestep
    accumulator: f32,
    /// Fixed timestep delta
    fixed_dt: f32,
    /// Maximum delta time to prevent spiral of death
    max_dt: f32,
    /// Most fixed updates run for a single frame
    max_updates: u32,
    /// Measure the wall clock and sleep off the remaining budget
    realtime: bool,
    /// Recent frame times for averaging
    frame_times: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameTiming {
    /// Create a new frame timing manager.
    ///
    /// # Arguments
    /// * `target_fps` - Target frames per second for frame limiting
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            target_fps,
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps)),
            last_frame: Instant::now(),
            accumulator: 0.0,
            fixed_dt: 1.0 / 50.0,
            max_dt: 0.25,
            max_updates: 10,
            realtime: true,
            frame_times: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Create with wall-clock pacing on or off.
    #[must_use]
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Create with a cap on fixed updates per frame.
    #[must_use]
    pub fn with_max_updates(mut self, max_updates: u32) -> Self {
        self.max_updates = max_updates.max(1);
        self
    }

    /// Set the fixed timestep.
    pub fn set_fixed_dt(&mut self, dt: f32) {
        self.fixed_dt = dt.max(0.001); // Minimum 1ms
    }

    /// Get the fixed timestep value.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Whether frames follow the wall clock.
    #[must_use]
    pub fn is_realtime(&self) -> bool {
        self.realtime
    }

    /// Delta time of the frame that is starting.
    ///
    /// Measured since the previous call when realtime, otherwise exactly one
    /// frame budget. Also stores the frame time for FPS calculation.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = if self.realtime {
            (now - self.last_frame).as_secs_f32()
        } else {
            self.frame_budget.as_secs_f32()
        };
        self.last_frame = now;

        // Clamp to prevent spiral of death
        let clamped_dt = dt.min(self.max_dt);

        self.frame_times.push_back(clamped_dt);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }

        clamped_dt
    }

    /// Accumulate time for fixed timestep updates.
    /// Returns the number of fixed updates that should be performed.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt;
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < self.max_updates {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // If we're still behind, drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Sleep for the remainder of the frame budget (realtime only).
    pub fn sleep_remainder(&self) {
        if !self.realtime {
            return;
        }

        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }

    /// Get the current FPS (averaged over recent frames).
    #[must_use]
    pub fn current_fps(&self) -> f32 {
        let avg = self.average_frame_time();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    /// Get the average frame time in milliseconds.
    #[must_use]
    pub fn average_frame_time_ms(&self) -> f32 {
        self.average_frame_time() * 1000.0
    }

    fn average_frame_time(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    /// Get the target FPS.
    #[must_use]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Reset timing (call after loading).
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.accumulator = 0.0;
        self.frame_times.clear();
    }
}
