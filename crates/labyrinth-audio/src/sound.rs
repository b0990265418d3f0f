//! Positional sound with a self-healing channel.
//!
//! A [`Sound3D`] owns one sound asset and the channel currently playing it.
//! The engine may invalidate that channel at any time (it finished, was
//! stopped, or was stolen for another sound), so every tick starts with a
//! liveness probe. A dead channel is replaced by a fresh paused one with the
//! effect chain, group, loop flag and pitch/frequency restored, and the
//! state machine folds back to [`SoundState::Ready`].
//!
//! ```text
//!            unpaused              paused
//!   Ready ───────────▶ Playing ───────────▶ Paused
//!     ▲                  │  ▲                │
//!     │     invalid      │  └────────────────┘
//!     └──────────────────┴───── unpaused ◀───┘ (invalid → Ready)
//! ```

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use labyrinth_common::{
    AudioError, AudioResult, ChannelGroupId, ChannelId, DspId, EngineCode, SoundId, Transform,
};

use crate::backend::{ConeSettings, LOOP_FOREVER, LOOP_ONCE};
use crate::dsp::DspType;
use crate::system::AudioSystem;

/// Reverb instance every sound sends to.
pub const REVERB_SEND_INSTANCE: usize = 0;

/// Pitch a ramping sound may never reach.
pub const PITCH_CEILING: f32 = 6.0;

/// Range footstep pitch is clamped to before any per-step variation.
pub const FOOTSTEP_PITCH_RANGE: (f32, f32) = (0.5, 1.5);

/// Playback state of a [`Sound3D`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundState {
    /// Fresh (paused) channel, playback not yet observed.
    Ready,
    /// Channel is running.
    Playing,
    /// Channel is paused.
    Paused,
}

/// Designer-facing parameters, pushed to the channel every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundParams {
    /// Start playing as soon as the sound is created.
    pub play_on_awake: bool,
    /// Loop forever instead of playing once.
    pub looping: bool,
    /// Silence without stopping.
    pub mute: bool,
    /// Linear volume (0.0-1.0).
    pub volume: f32,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Playback frequency override in Hz.
    pub frequency: Option<f32>,
    /// Directional cone.
    pub cone: ConeSettings,
    /// Distance at which attenuation starts.
    pub min_distance: f32,
    /// Distance at which attenuation stops.
    pub max_distance: f32,
    /// Send level to the reverb instance.
    pub reverb_level: f32,
}

impl Default for SoundParams {
    fn default() -> Self {
        Self {
            play_on_awake: false,
            looping: false,
            mute: false,
            volume: 1.0,
            pitch: 1.0,
            frequency: None,
            cone: ConeSettings::default(),
            min_distance: 1.0,
            max_distance: 10_000.0,
            reverb_level: 1.0,
        }
    }
}

impl SoundParams {
    /// Engine loop count for the loop flag.
    #[must_use]
    pub const fn loop_count(&self) -> i32 {
        if self.looping {
            LOOP_FOREVER
        } else {
            LOOP_ONCE
        }
    }
}

/// Footstep pitch from movement speed, clamped to [`FOOTSTEP_PITCH_RANGE`].
#[must_use]
pub fn pitch_for_speed(speed: f32, forward_speed: f32) -> f32 {
    let (low, high) = FOOTSTEP_PITCH_RANGE;
    if forward_speed <= 0.0 || !speed.is_finite() {
        return low;
    }
    (speed / forward_speed).clamp(low, high)
}

/// A positional sound bound to one asset.
pub struct Sound3D {
    system: Arc<AudioSystem>,
    name: String,
    sound: SoundId,
    channel: Option<ChannelId>,
    state: SoundState,
    group: Option<ChannelGroupId>,
    effects: Vec<DspId>,
    previous_position: Vec3,
    /// Live parameters, applied on the next [`Sound3D::fixed_update`].
    pub params: SoundParams,
}

impl std::fmt::Debug for Sound3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sound3D")
            .field("name", &self.name)
            .field("sound", &self.sound)
            .field("channel", &self.channel)
            .field("state", &self.state)
            .field("effects", &self.effects)
            .finish_non_exhaustive()
    }
}

impl Sound3D {
    /// Load `clip`, acquire a paused channel and apply `params`.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::ResourceLoad`] if the clip cannot be loaded.
    /// A missing channel slot is not an error; acquisition is retried every
    /// tick.
    pub fn new(
        system: Arc<AudioSystem>,
        clip: &str,
        params: SoundParams,
        transform: &Transform,
    ) -> AudioResult<Self> {
        let sound = system.create_sound_3d(clip)?;
        let mut this = Self {
            system,
            name: clip.to_string(),
            sound,
            channel: None,
            state: SoundState::Ready,
            group: None,
            effects: Vec::new(),
            previous_position: transform.position,
            params,
        };
        this.replace_channel();
        if this.params.play_on_awake {
            match this.play() {
                Ok(()) | Err(AudioError::ChannelInvalidated) => {},
                Err(err) => return Err(err),
            }
        }
        Ok(this)
    }

    /// Asset name this sound was loaded from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sound asset handle.
    #[must_use]
    pub const fn sound_id(&self) -> SoundId {
        self.sound
    }

    /// Current channel handle, if one is held.
    #[must_use]
    pub const fn channel_id(&self) -> Option<ChannelId> {
        self.channel
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SoundState {
        self.state
    }

    /// Effect chain in processing order.
    #[must_use]
    pub fn effects(&self) -> &[DspId] {
        &self.effects
    }

    /// Group replacement channels rejoin.
    #[must_use]
    pub const fn channel_group(&self) -> Option<ChannelGroupId> {
        self.group
    }

    fn channel(&self) -> AudioResult<ChannelId> {
        self.channel.ok_or(AudioError::ChannelInvalidated)
    }

    // ============================================
    // State machine
    // ============================================

    /// Probe the channel and advance the state machine.
    fn refresh_state(&mut self) {
        let Some(channel) = self.channel else {
            self.replace_channel();
            return;
        };
        let ctl = self.system.channel(channel);
        match ctl.probe() {
            Err(code) if code.is_benign() => {
                debug!("Channel {channel} of '{}' ended", self.name);
                self.replace_channel();
            },
            Err(code) => {
                let _ = self.system.check::<bool>("Channel::isPlaying", Err(code));
            },
            Ok(_) => {
                let Ok(paused) = ctl.is_paused() else {
                    return;
                };
                self.state = match (self.state, paused) {
                    (SoundState::Ready | SoundState::Paused, false) => SoundState::Playing,
                    (SoundState::Playing, true) => SoundState::Paused,
                    (state, _) => state,
                };
            },
        }
    }

    /// Acquire a fresh paused channel and rebuild its persistent setup.
    fn replace_channel(&mut self) {
        self.state = SoundState::Ready;
        match self.system.create_channel(self.sound) {
            Ok(channel) => {
                self.channel = Some(channel);
                if let Err(err) = self.restore(channel) {
                    warn!("Restoring channel {channel} for '{}' failed: {err}", self.name);
                }
            },
            Err(err) => {
                if self.channel.take().is_some() {
                    warn!("No channel for '{}', retrying next tick: {err}", self.name);
                }
            },
        }
    }

    /// Every step is attempted; the first failure is returned.
    fn restore(&mut self, channel: ChannelId) -> AudioResult<()> {
        let ctl = self.system.channel(channel);
        let mut results = vec![ctl.set_loop_count(self.params.loop_count())];
        if self.group.is_some() {
            let joined = ctl.set_group(self.group);
            if matches!(joined, Err(AudioError::EngineCall(EngineCode::InvalidHandle))) {
                warn!("Group of '{}' was released, staying on master", self.name);
                self.group = None;
            }
            results.push(joined);
        }
        let mut attached = 0;
        for dsp in &self.effects {
            let result = ctl.add_dsp(attached, *dsp);
            if result.is_ok() {
                attached += 1;
            }
            results.push(result);
        }
        results.push(ctl.set_pitch(self.params.pitch));
        if let Some(frequency) = self.params.frequency {
            results.push(ctl.set_frequency(frequency));
        }
        results.into_iter().find_map(Result::err).map_or(Ok(()), Err)
    }

    /// Per-tick update: probe, then push every parameter and the 3D attributes.
    ///
    /// Velocity is the position delta over `dt`, an approximation for doppler
    /// rather than physical velocity.
    pub fn fixed_update(&mut self, transform: &Transform, dt: f32) {
        self.refresh_state();

        let velocity = if dt > 0.0 {
            (transform.position - self.previous_position) / dt
        } else {
            Vec3::ZERO
        };
        self.previous_position = transform.position;

        let Some(channel) = self.channel else {
            return;
        };
        let ctl = self.system.channel(channel);
        let p = &self.params;
        let results = [
            ctl.set_mute(p.mute),
            ctl.set_loop_count(p.loop_count()),
            ctl.set_volume(p.volume),
            ctl.set_pitch(p.pitch),
            p.frequency.map_or(Ok(()), |f| ctl.set_frequency(f)),
            ctl.set_cone_settings(p.cone),
            ctl.set_cone_orientation(transform.forward),
            ctl.set_min_max_distance(p.min_distance, p.max_distance),
            ctl.set_reverb_wet(REVERB_SEND_INSTANCE, p.reverb_level),
            ctl.set_attributes_3d(transform.position, velocity),
        ];
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            debug!("'{}': {failed} parameter pushes failed this tick", self.name);
        }
    }

    // ============================================
    // Transport
    // ============================================

    /// Start playback, or restart from the top if already playing.
    ///
    /// # Errors
    ///
    /// Returns an error if no channel is held or the engine call fails.
    pub fn play(&mut self) -> AudioResult<()> {
        self.refresh_state();
        let ctl = self.system.channel(self.channel()?);
        match self.state {
            SoundState::Playing => ctl.set_position_ms(0),
            SoundState::Paused | SoundState::Ready => ctl.set_paused(false),
        }
    }

    /// Pause if playing.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn pause(&mut self) -> AudioResult<()> {
        if self.state != SoundState::Playing {
            return Ok(());
        }
        self.system.channel(self.channel()?).set_paused(true)
    }

    /// Unpause if paused.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn resume(&mut self) -> AudioResult<()> {
        if self.state != SoundState::Paused {
            return Ok(());
        }
        self.system.channel(self.channel()?).set_paused(false)
    }

    /// Stop a playing or paused channel. The next probe replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn stop(&mut self) -> AudioResult<()> {
        if self.state == SoundState::Ready {
            return Ok(());
        }
        self.system.channel(self.channel()?).stop()
    }

    // ============================================
    // Effects
    // ============================================

    /// Append a DSP to the effect chain. The sound takes ownership of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the attachment. A dead channel
    /// is not an error: the replacement picks the effect up.
    pub fn add_effect(&mut self, dsp: DspId) -> AudioResult<()> {
        let index = self.effects.len();
        self.effects.push(dsp);
        let Some(channel) = self.channel else {
            return Ok(());
        };
        match self.system.channel(channel).add_dsp(index, dsp) {
            Err(AudioError::ChannelInvalidated) => Ok(()),
            other => other,
        }
    }

    /// Create a DSP of `kind`, set `parameters` and append it.
    ///
    /// # Errors
    ///
    /// Returns an error if creation, a parameter or the attachment fails.
    pub fn add_effect_of(&mut self, kind: DspType, parameters: &[(usize, f32)]) -> AudioResult<DspId> {
        let dsp = self.system.create_dsp(kind)?;
        for &(index, value) in parameters {
            if let Err(err) = self.system.set_dsp_parameter(dsp, index, value) {
                let _ = self.system.release_dsp(dsp);
                return Err(err);
            }
        }
        self.add_effect(dsp)?;
        Ok(dsp)
    }

    // ============================================
    // Getters / setters
    // ============================================

    /// Whether the channel is paused.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::ChannelInvalidated`] if no live channel is held.
    pub fn is_paused(&self) -> AudioResult<bool> {
        self.system.channel(self.channel()?).is_paused()
    }

    /// Whether the channel is alive.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::ChannelInvalidated`] if no live channel is held.
    pub fn is_playing(&self) -> AudioResult<bool> {
        self.system.channel(self.channel()?).is_playing()
    }

    /// Whether the channel has gone away since the last probe.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.channel.map_or(true, |channel| {
            matches!(self.system.channel(channel).probe(), Err(code) if code.is_benign())
        })
    }

    /// Channel volume as the engine reports it.
    ///
    /// # Errors
    ///
    /// Returns an error if no live channel is held.
    pub fn volume(&self) -> AudioResult<f32> {
        self.system.channel(self.channel()?).volume()
    }

    /// Playback position in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if no live channel is held.
    pub fn position_ms(&self) -> AudioResult<u32> {
        self.system.channel(self.channel()?).position_ms()
    }

    /// Seek to a position in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if no live channel is held or the position is past
    /// the end of the clip.
    pub fn set_position_ms(&mut self, position: u32) -> AudioResult<()> {
        self.system.channel(self.channel()?).set_position_ms(position)
    }

    /// Join a mixer group (`None` = master). Replacement channels rejoin it.
    ///
    /// # Errors
    ///
    /// Returns an error if the group handle is stale.
    pub fn set_channel_group(&mut self, group: Option<ChannelGroupId>) -> AudioResult<()> {
        self.group = group;
        let Some(channel) = self.channel else {
            return Ok(());
        };
        match self.system.channel(channel).set_group(group) {
            Err(AudioError::ChannelInvalidated) => Ok(()),
            other => other,
        }
    }

    /// Raise the pitch by `step` while it stays below `limit`.
    ///
    /// Returns whether the pitch changed.
    pub fn raise_pitch(&mut self, step: f32, limit: f32) -> bool {
        if self.params.pitch + step < limit {
            self.params.pitch += step;
            true
        } else {
            false
        }
    }
}

impl Drop for Sound3D {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            let _ = self.system.channel(channel).stop();
        }
        for dsp in self.effects.drain(..) {
            let _ = self.system.release_dsp(dsp);
        }
        let _ = self.system.release_sound(self.sound);
        debug!("Released sound '{}'", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{distortion, highpass};
    use crate::software::ClipInfo;
    use crate::system::AudioConfig;
    use proptest::prelude::*;

    fn system(length_ms: u32) -> Arc<AudioSystem> {
        Arc::new(
            AudioSystem::software_with_clips(
                AudioConfig::default(),
                [("hum", ClipInfo::with_length(length_ms))],
            )
            .expect("software engine"),
        )
    }

    fn tick(sound: &mut Sound3D, system: &AudioSystem, dt: f32) {
        sound.fixed_update(&Transform::default(), dt);
        system.update(dt).expect("update");
    }

    #[test]
    fn test_new_sound_is_ready_and_paused() {
        let system = system(1000);
        let sound = Sound3D::new(system, "hum", SoundParams::default(), &Transform::default())
            .expect("sound");
        assert_eq!(sound.state(), SoundState::Ready);
        assert!(sound.is_paused().expect("paused"));
        assert!(!sound.has_ended());
    }

    #[test]
    fn test_missing_clip() {
        let system = system(1000);
        let err = Sound3D::new(system, "silence", SoundParams::default(), &Transform::default())
            .expect_err("missing clip");
        assert!(matches!(err, AudioError::ResourceLoad { .. }));
    }

    #[test]
    fn test_play_pause_resume_cycle() {
        let system = system(10_000);
        let mut sound =
            Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
                .expect("sound");

        sound.play().expect("play");
        tick(&mut sound, &system, 0.1);
        assert_eq!(sound.state(), SoundState::Playing);

        sound.pause().expect("pause");
        tick(&mut sound, &system, 0.1);
        assert_eq!(sound.state(), SoundState::Paused);

        sound.resume().expect("resume");
        tick(&mut sound, &system, 0.1);
        assert_eq!(sound.state(), SoundState::Playing);
    }

    #[test]
    fn test_play_while_playing_seeks_to_start() {
        let system = system(10_000);
        let mut sound =
            Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
                .expect("sound");
        sound.play().expect("play");
        tick(&mut sound, &system, 0.5);
        tick(&mut sound, &system, 0.5);
        let channel = sound.channel_id();
        assert!(sound.position_ms().expect("position") > 0);

        sound.play().expect("restart");
        assert_eq!(sound.position_ms().expect("position"), 0);
        assert_eq!(sound.channel_id(), channel);
    }

    #[test]
    fn test_stop_folds_back_to_ready() {
        let system = system(10_000);
        let mut sound =
            Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
                .expect("sound");
        sound.play().expect("play");
        tick(&mut sound, &system, 0.1);
        let old = sound.channel_id();

        sound.stop().expect("stop");
        assert_eq!(sound.state(), SoundState::Playing);
        tick(&mut sound, &system, 0.1);
        assert_eq!(sound.state(), SoundState::Ready);
        assert_ne!(sound.channel_id(), old);
        assert_eq!(system.failure_count(), 0);
    }

    #[test]
    fn test_replacement_restores_effect_chain_and_pitch() {
        let system = system(100);
        let params = SoundParams {
            pitch: 1.25,
            ..SoundParams::default()
        };
        let mut sound = Sound3D::new(Arc::clone(&system), "hum", params, &Transform::default())
            .expect("sound");
        let a = sound
            .add_effect_of(DspType::Distortion, &[(distortion::LEVEL, 0.85)])
            .expect("a");
        let b = sound
            .add_effect_of(DspType::Highpass, &[(highpass::CUTOFF, 2000.0)])
            .expect("b");
        let c = sound.add_effect_of(DspType::Echo, &[]).expect("c");

        sound.play().expect("play");
        tick(&mut sound, &system, 0.05);
        assert_eq!(sound.state(), SoundState::Playing);
        let old = sound.channel_id();

        // Clip runs out during this engine update.
        tick(&mut sound, &system, 0.1);
        tick(&mut sound, &system, 0.0);
        assert_eq!(sound.state(), SoundState::Ready);
        let new = sound.channel_id().expect("replacement");
        assert_ne!(Some(new), old);

        let ctl = system.channel(new);
        assert_eq!(ctl.num_dsps().expect("chain"), 3);
        assert_eq!(ctl.dsp(0).expect("dsp"), a);
        assert_eq!(ctl.dsp(1).expect("dsp"), b);
        assert_eq!(ctl.dsp(2).expect("dsp"), c);
        assert!((ctl.pitch().expect("pitch") - 1.25).abs() < f32::EPSILON);
        assert!(ctl.is_paused().expect("paused"));
    }

    #[test]
    fn test_replacement_keeps_loop_volume_pitch() {
        let system = system(100);
        let params = SoundParams {
            looping: true,
            volume: 0.5,
            pitch: 1.2,
            ..SoundParams::default()
        };
        let mut sound = Sound3D::new(Arc::clone(&system), "hum", params, &Transform::default())
            .expect("sound");
        sound.play().expect("play");
        tick(&mut sound, &system, 0.0);

        let old = sound.channel_id().expect("channel");
        system.channel(old).stop().expect("end channel");
        tick(&mut sound, &system, 0.0);

        let ctl = system.channel(sound.channel_id().expect("replacement"));
        assert_eq!(ctl.loop_count().expect("loop"), LOOP_FOREVER);
        assert!((ctl.volume().expect("volume") - 0.5).abs() < f32::EPSILON);
        assert!((ctl.pitch().expect("pitch") - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_stolen_ready_channel_is_replaced() {
        let config = AudioConfig::default().with_max_channels(1);
        let system = Arc::new(
            AudioSystem::software_with_clips(config, [("hum", ClipInfo::with_length(1000))])
                .expect("software engine"),
        );
        let mut first = Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
            .expect("first");
        let second = Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
            .expect("second");
        assert!(first.has_ended());

        first.fixed_update(&Transform::default(), 0.0);
        assert_eq!(first.state(), SoundState::Ready);
        assert!(!first.has_ended());
        assert!(second.has_ended());
    }

    #[test]
    fn test_velocity_from_position_delta() {
        let system = system(10_000);
        let mut sound =
            Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
                .expect("sound");
        sound.fixed_update(&Transform::from_position(Vec3::new(1.0, 0.0, 0.0)), 0.5);
        let (position, velocity) = system
            .channel(sound.channel_id().expect("channel"))
            .attributes_3d()
            .expect("attributes");
        assert_eq!(position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(velocity, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_group_membership_survives_replacement() {
        let system = system(1000);
        let group = system.create_channel_group("ambience").expect("group");
        let mut sound =
            Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
                .expect("sound");
        sound.set_channel_group(Some(group)).expect("join");
        sound.play().expect("play");
        tick(&mut sound, &system, 0.0);
        sound.stop().expect("stop");
        tick(&mut sound, &system, 0.0);
        let channel = sound.channel_id().expect("replacement");
        assert_eq!(system.channel(channel).group().expect("group"), Some(group));
    }

    #[test]
    fn test_released_group_falls_back_to_master() {
        let system = system(1000);
        let group = system.create_channel_group("ambience").expect("group");
        let mut sound =
            Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
                .expect("sound");
        sound.set_channel_group(Some(group)).expect("join");
        system.release_channel_group(group).expect("release");

        sound.play().expect("play");
        tick(&mut sound, &system, 0.0);
        sound.stop().expect("stop");
        tick(&mut sound, &system, 0.0);

        let channel = sound.channel_id().expect("replacement");
        assert_eq!(system.channel(channel).group().expect("group"), None);
        assert_eq!(sound.channel_group(), None);
        assert_eq!(system.failure_count(), 1);
    }

    #[test]
    fn test_replacement_skips_a_stale_effect_and_restores_the_rest() {
        let system = system(1000);
        let params = SoundParams {
            pitch: 1.25,
            frequency: Some(22_050.0),
            ..SoundParams::default()
        };
        let mut sound = Sound3D::new(Arc::clone(&system), "hum", params, &Transform::default())
            .expect("sound");
        let a = sound.add_effect_of(DspType::Lowpass, &[]).expect("a");
        let b = sound.add_effect_of(DspType::Echo, &[]).expect("b");
        let c = sound.add_effect_of(DspType::Highpass, &[]).expect("c");
        system.release_dsp(b).expect("release");

        sound.play().expect("play");
        tick(&mut sound, &system, 0.0);
        sound.stop().expect("stop");
        tick(&mut sound, &system, 0.0);

        let ctl = system.channel(sound.channel_id().expect("replacement"));
        assert_eq!(ctl.num_dsps().expect("chain"), 2);
        assert_eq!(ctl.dsp(0).expect("dsp"), a);
        assert_eq!(ctl.dsp(1).expect("dsp"), c);
        assert!((ctl.pitch().expect("pitch") - 1.25).abs() < f32::EPSILON);
        assert!((ctl.frequency().expect("frequency") - 22_050.0).abs() < f32::EPSILON);
        assert_eq!(system.failure_count(), 1);
    }

    #[test]
    fn test_drop_releases_everything() {
        let system = system(1000);
        let (channel, dsp) = {
            let mut sound =
                Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
                    .expect("sound");
            let dsp = sound.add_effect_of(DspType::Lowpass, &[]).expect("dsp");
            (sound.channel_id().expect("channel"), dsp)
        };
        assert!(system.channel(channel).probe().is_err());
        assert!(system.dsp(dsp).kind().is_err());
    }

    #[test]
    fn test_raise_pitch_stops_below_ceiling() {
        let system = system(1000);
        let mut sound = Sound3D::new(system, "hum", SoundParams::default(), &Transform::default())
            .expect("sound");
        let mut steps = 0;
        while sound.raise_pitch(1.0, PITCH_CEILING) {
            steps += 1;
        }
        assert_eq!(steps, 4);
        assert!((sound.params.pitch - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pitch_for_speed() {
        assert!((pitch_for_speed(5.0, 5.0) - 1.0).abs() < f32::EPSILON);
        assert!((pitch_for_speed(0.0, 5.0) - 0.5).abs() < f32::EPSILON);
        assert!((pitch_for_speed(50.0, 5.0) - 1.5).abs() < f32::EPSILON);
        assert!((pitch_for_speed(1.0, 0.0) - 0.5).abs() < f32::EPSILON);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Play,
        Pause,
        Resume,
        Stop,
        Tick(f32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Play),
            Just(Op::Pause),
            Just(Op::Resume),
            Just(Op::Stop),
            (0.0f32..0.2).prop_map(Op::Tick),
        ]
    }

    proptest! {
        #[test]
        fn prop_transport_keeps_state_consistent(ops in prop::collection::vec(op(), 1..40)) {
            let system = system(250);
            let mut sound = Sound3D::new(Arc::clone(&system), "hum", SoundParams::default(), &Transform::default())
                .expect("sound");

            for op in ops {
                let before = sound.channel_id().map(|c| system.channel(c).is_paused().ok());
                match op {
                    Op::Play => { let _ = sound.play(); },
                    Op::Pause => {
                        let state = sound.state();
                        let _ = sound.pause();
                        if state != SoundState::Playing {
                            let after = sound.channel_id().map(|c| system.channel(c).is_paused().ok());
                            prop_assert_eq!(before, after);
                        }
                    },
                    Op::Resume => {
                        let state = sound.state();
                        let _ = sound.resume();
                        if state != SoundState::Paused {
                            let after = sound.channel_id().map(|c| system.channel(c).is_paused().ok());
                            prop_assert_eq!(before, after);
                        }
                    },
                    Op::Stop => { let _ = sound.stop(); },
                    Op::Tick(dt) => {
                        sound.fixed_update(&Transform::default(), dt);
                        let paused = sound.is_paused().ok();
                        match sound.state() {
                            SoundState::Playing => prop_assert_eq!(paused, Some(false)),
                            SoundState::Paused => prop_assert_eq!(paused, Some(true)),
                            SoundState::Ready => {},
                        }
                        system.update(dt).expect("update");
                    },
                }
            }
            prop_assert_eq!(system.failure_count(), 0);
        }
    }
}
