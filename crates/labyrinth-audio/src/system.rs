//! Audio engine facade.
//!
//! `AudioSystem` owns the single connection to the audio engine and is the
//! only place engine result codes are inspected. Components receive it as an
//! `Arc<AudioSystem>` from the composition root and talk to engine objects
//! through short-lived typed controllers ([`ChannelCtl`], [`GroupCtl`],
//! [`GeometryCtl`], [`ReverbCtl`], [`DspCtl`]) whose every call is routed
//! through [`AudioSystem::check`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use labyrinth_common::{
    AudioError, AudioResult, ChannelGroupId, ChannelId, DspId, EngineCode, EngineResult,
    GeometryId, ReverbId, SoundId,
};

use crate::backend::{
    AudioBackend, ConeSettings, ListenerAttributes, Occlusion, Settings3D, SoundMode, LOOP_ONCE,
};
use crate::dsp::DspType;
use crate::presets::ReverbProperties;
use crate::software::{ClipInfo, SoftwareConfig, SoftwareEngine};

/// Default directory sound assets are resolved against.
pub const DEFAULT_AUDIO_ROOT: &str = "assets/audio";

/// Default sound asset extension.
pub const DEFAULT_EXTENSION: &str = "wav";

// ============================================================================
// Configuration
// ============================================================================

/// Audio system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Directory sound assets are loaded from.
    pub audio_root: PathBuf,
    /// File extension appended to sound names.
    pub extension: String,
    /// Size of the channel pool.
    pub max_channels: usize,
    /// Steal the oldest channel when the pool is exhausted.
    pub steal_channels: bool,
    /// Doppler pitch-shift multiplier.
    pub doppler_scale: f32,
    /// World units per meter.
    pub distance_factor: f32,
    /// Distance attenuation multiplier.
    pub rolloff_scale: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let settings = Settings3D::default();
        Self {
            audio_root: PathBuf::from(DEFAULT_AUDIO_ROOT),
            extension: DEFAULT_EXTENSION.to_string(),
            max_channels: SoftwareConfig::default().max_channels,
            steal_channels: true,
            doppler_scale: settings.doppler_scale,
            distance_factor: settings.distance_factor,
            rolloff_scale: settings.rolloff_scale,
        }
    }
}

impl AudioConfig {
    /// Create config with an audio root directory.
    #[must_use]
    pub fn with_audio_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.audio_root = root.into();
        self
    }

    /// Create config with a channel pool size.
    #[must_use]
    pub const fn with_max_channels(mut self, max: usize) -> Self {
        self.max_channels = max;
        self
    }

    /// Create config with channel stealing enabled/disabled.
    #[must_use]
    pub const fn with_stealing(mut self, enabled: bool) -> Self {
        self.steal_channels = enabled;
        self
    }

    /// Resolved path of a named sound asset.
    #[must_use]
    pub fn asset_path(&self, name: &str) -> PathBuf {
        self.audio_root.join(format!("{name}.{}", self.extension))
    }

    /// The three global 3D multipliers as one unit.
    #[must_use]
    pub const fn settings_3d(&self) -> Settings3D {
        Settings3D {
            doppler_scale: self.doppler_scale,
            distance_factor: self.distance_factor,
            rolloff_scale: self.rolloff_scale,
        }
    }

    /// Channel pool settings for the software engine.
    #[must_use]
    pub const fn software_config(&self) -> SoftwareConfig {
        SoftwareConfig {
            max_channels: self.max_channels,
            steal_channels: self.steal_channels,
        }
    }
}

// ============================================================================
// AudioSystem
// ============================================================================

/// Facade over the audio engine instance.
pub struct AudioSystem {
    config: AudioConfig,
    backend: Mutex<Box<dyn AudioBackend>>,
    failures: AtomicU64,
}

impl std::fmt::Debug for AudioSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSystem")
            .field("config", &self.config)
            .field("failures", &self.failure_count())
            .finish_non_exhaustive()
    }
}

impl AudioSystem {
    /// Connect to an engine and apply the configured 3D settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects its initial configuration.
    pub fn new(config: AudioConfig, backend: Box<dyn AudioBackend>) -> AudioResult<Self> {
        let system = Self {
            config,
            backend: Mutex::new(backend),
            failures: AtomicU64::new(0),
        };
        let version = system.call("System::getVersion", |b| b.version())?;
        system.call("System::set3DSettings", |b| {
            b.set_3d_settings(system.config.settings_3d())
        })?;
        info!("Audio system ready (engine version {version:#010x})");
        Ok(system)
    }

    /// Connect to a fresh [`SoftwareEngine`] sized from the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured 3D settings are invalid.
    pub fn software(config: AudioConfig) -> AudioResult<Self> {
        Self::software_with_clips(config, std::iter::empty::<(&str, ClipInfo)>())
    }

    /// Like [`Self::software`], with in-memory clips registered by sound name.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured 3D settings are invalid.
    pub fn software_with_clips<'a>(
        config: AudioConfig,
        clips: impl IntoIterator<Item = (&'a str, ClipInfo)>,
    ) -> AudioResult<Self> {
        let mut engine = SoftwareEngine::new(config.software_config());
        for (name, info) in clips {
            engine.register_clip(config.asset_path(name), info);
        }
        Self::new(config, Box::new(engine))
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Number of non-benign engine failures seen so far.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Single check point for engine results.
    ///
    /// Every failure is logged and counted. Channel calls go through
    /// [`ChannelCtl`], which reports a dead channel as
    /// [`AudioError::ChannelInvalidated`] without logging it.
    pub fn check<T>(&self, context: &str, result: EngineResult<T>) -> AudioResult<T> {
        result.map_err(|code| {
            self.record(context, code);
            AudioError::from(code)
        })
    }

    fn record(&self, context: &str, code: EngineCode) {
        error!("{context} failed: {code}");
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn with_backend<R>(&self, f: impl FnOnce(&mut dyn AudioBackend) -> R) -> R {
        let mut backend = self.backend.lock();
        f(backend.as_mut())
    }

    fn call<T>(
        &self,
        context: &str,
        f: impl FnOnce(&mut dyn AudioBackend) -> EngineResult<T>,
    ) -> AudioResult<T> {
        let result = self.with_backend(f);
        self.check(context, result)
    }

    /// Like `call`, but an invalid handle is benign when `channel` itself is
    /// gone. A live channel with a stale group or DSP argument still fails.
    fn call_channel<T>(
        &self,
        context: &str,
        channel: ChannelId,
        f: impl FnOnce(&mut dyn AudioBackend) -> EngineResult<T>,
    ) -> AudioResult<T> {
        let (result, gone) = self.with_backend(|b| {
            let result = f(&mut *b);
            let gone = matches!(result, Err(code) if code.is_benign())
                && b.channel_is_playing(channel).is_err();
            (result, gone)
        });
        if gone {
            return Err(AudioError::ChannelInvalidated);
        }
        self.check(context, result)
    }

    /// Engine version number.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn version(&self) -> AudioResult<u32> {
        self.call("System::getVersion", |b| b.version())
    }

    /// Advance the engine by one tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn update(&self, dt: f32) -> AudioResult<()> {
        self.call("System::update", |b| b.update(dt))
    }

    // ------------------------------------------------------------------
    // Object creation
    // ------------------------------------------------------------------

    /// Load `<audio_root>/<name>.<extension>` as a positional, loopable sound.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::ResourceLoad`] if the asset is missing or cannot
    /// be decoded.
    pub fn create_sound_3d(&self, name: &str) -> AudioResult<SoundId> {
        let path = self.config.asset_path(name);
        let result = self.with_backend(|b| b.create_sound(&path, SoundMode::POSITIONAL_LOOP));
        match result {
            Ok(sound) => {
                debug!("Loaded sound '{name}' as {sound}");
                Ok(sound)
            },
            Err(code) => {
                self.record("System::createSound", code);
                Err(AudioError::ResourceLoad {
                    name: name.to_string(),
                    path,
                    code,
                })
            },
        }
    }

    /// Start `sound` paused on the master group, set to play once.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::EngineResourceExhausted`] if no channel slot is
    /// available.
    pub fn create_channel(&self, sound: SoundId) -> AudioResult<ChannelId> {
        let result = self.with_backend(|b| b.play_sound(sound, None, true));
        let channel = match result {
            Ok(channel) => channel,
            Err(EngineCode::ChannelAlloc) => {
                self.record("System::playSound", EngineCode::ChannelAlloc);
                return Err(AudioError::EngineResourceExhausted);
            },
            Err(code) => return self.check("System::playSound", Err(code)),
        };
        self.channel(channel).set_loop_count(LOOP_ONCE)?;
        Ok(channel)
    }

    /// Create a named mixer group.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn create_channel_group(&self, name: &str) -> AudioResult<ChannelGroupId> {
        self.call("System::createChannelGroup", |b| b.create_channel_group(name))
    }

    /// Create a 3D reverb region.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn create_reverb(&self) -> AudioResult<ReverbId> {
        self.call("System::createReverb3D", |b| b.create_reverb())
    }

    /// Allocate occlusion geometry with a fixed capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn create_geometry(&self, max_polygons: usize, max_vertices: usize) -> AudioResult<GeometryId> {
        self.call("System::createGeometry", |b| {
            b.create_geometry(max_polygons, max_vertices)
        })
    }

    /// Create a DSP unit of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn create_dsp(&self, kind: DspType) -> AudioResult<DspId> {
        self.call("System::createDSPByType", |b| b.create_dsp(kind))
    }

    /// Set a float parameter on a DSP unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or value is out of range.
    pub fn set_dsp_parameter(&self, dsp: DspId, index: usize, value: f32) -> AudioResult<()> {
        self.dsp(dsp).set_parameter(index, value)
    }

    // ------------------------------------------------------------------
    // Release
    // ------------------------------------------------------------------

    /// Release a sound asset.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn release_sound(&self, sound: SoundId) -> AudioResult<()> {
        self.call("Sound::release", |b| b.release_sound(sound))
    }

    /// Release a mixer group.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn release_channel_group(&self, group: ChannelGroupId) -> AudioResult<()> {
        self.call("ChannelGroup::release", |b| b.release_channel_group(group))
    }

    /// Release a DSP unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn release_dsp(&self, dsp: DspId) -> AudioResult<()> {
        self.call("DSP::release", |b| b.release_dsp(dsp))
    }

    /// Release occlusion geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn release_geometry(&self, geometry: GeometryId) -> AudioResult<()> {
        self.call("Geometry::release", |b| b.release_geometry(geometry))
    }

    /// Release a reverb region.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn release_reverb(&self, reverb: ReverbId) -> AudioResult<()> {
        self.call("Reverb3D::release", |b| b.release_reverb(reverb))
    }

    // ------------------------------------------------------------------
    // Global 3D settings
    // ------------------------------------------------------------------

    fn update_settings(&self, f: impl FnOnce(&mut Settings3D)) -> AudioResult<()> {
        self.call("System::set3DSettings", |b| {
            let mut settings = b.settings_3d()?;
            f(&mut settings);
            b.set_3d_settings(settings)
        })
    }

    fn settings(&self) -> AudioResult<Settings3D> {
        self.call("System::get3DSettings", |b| b.settings_3d())
    }

    /// Doppler pitch-shift multiplier.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn doppler_scale(&self) -> AudioResult<f32> {
        Ok(self.settings()?.doppler_scale)
    }

    /// Set the doppler multiplier, keeping the other two settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is rejected.
    pub fn set_doppler_scale(&self, value: f32) -> AudioResult<()> {
        self.update_settings(|s| s.doppler_scale = value)
    }

    /// World units per meter.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn distance_factor(&self) -> AudioResult<f32> {
        Ok(self.settings()?.distance_factor)
    }

    /// Set the distance factor, keeping the other two settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is rejected.
    pub fn set_distance_factor(&self, value: f32) -> AudioResult<()> {
        self.update_settings(|s| s.distance_factor = value)
    }

    /// Distance attenuation multiplier.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn rolloff_scale(&self) -> AudioResult<f32> {
        Ok(self.settings()?.rolloff_scale)
    }

    /// Set the rolloff multiplier, keeping the other two settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is rejected.
    pub fn set_rolloff_scale(&self, value: f32) -> AudioResult<()> {
        self.update_settings(|s| s.rolloff_scale = value)
    }

    /// Move the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if any vector is not finite.
    pub fn set_listener(&self, position: Vec3, velocity: Vec3, forward: Vec3, up: Vec3) -> AudioResult<()> {
        let attributes = ListenerAttributes {
            position,
            velocity,
            forward,
            up,
        };
        self.call("System::set3DListenerAttributes", |b| b.set_listener(attributes))
    }

    /// Current listener attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn listener(&self) -> AudioResult<ListenerAttributes> {
        self.call("System::get3DListenerAttributes", |b| b.listener())
    }

    /// Direct and reverb occlusion between `listener` and `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if either point is not finite.
    pub fn occlusion(&self, listener: Vec3, source: Vec3) -> AudioResult<Occlusion> {
        self.call("System::getGeometryOcclusion", |b| {
            b.geometry_occlusion(listener, source)
        })
    }

    // ------------------------------------------------------------------
    // Controllers
    // ------------------------------------------------------------------

    /// Checked access to a channel.
    #[must_use]
    pub const fn channel(&self, id: ChannelId) -> ChannelCtl<'_> {
        ChannelCtl { system: self, id }
    }

    /// Checked access to a channel group.
    #[must_use]
    pub const fn group(&self, id: ChannelGroupId) -> GroupCtl<'_> {
        GroupCtl { system: self, id }
    }

    /// Checked access to a geometry object.
    #[must_use]
    pub const fn geometry(&self, id: GeometryId) -> GeometryCtl<'_> {
        GeometryCtl { system: self, id }
    }

    /// Checked access to a reverb region.
    #[must_use]
    pub const fn reverb(&self, id: ReverbId) -> ReverbCtl<'_> {
        ReverbCtl { system: self, id }
    }

    /// Checked access to a DSP unit.
    #[must_use]
    pub const fn dsp(&self, id: DspId) -> DspCtl<'_> {
        DspCtl { system: self, id }
    }
}

// ============================================================================
// Controllers
// ============================================================================

/// Checked operations on one channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelCtl<'a> {
    system: &'a AudioSystem,
    id: ChannelId,
}

impl ChannelCtl<'_> {
    /// Channel handle.
    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    fn call<T>(
        &self,
        context: &str,
        f: impl FnOnce(&mut dyn AudioBackend) -> EngineResult<T>,
    ) -> AudioResult<T> {
        self.system.call_channel(context, self.id, f)
    }

    /// Raw liveness probe. `Err(InvalidHandle)` means the channel is gone;
    /// nothing is logged or counted.
    pub fn probe(&self) -> EngineResult<bool> {
        let id = self.id;
        self.system.with_backend(|b| b.channel_is_playing(id))
    }

    /// Whether the channel is alive, as a checked call.
    pub fn is_playing(&self) -> AudioResult<bool> {
        let id = self.id;
        self.call("Channel::isPlaying", |b| b.channel_is_playing(id))
    }

    /// Paused flag.
    pub fn is_paused(&self) -> AudioResult<bool> {
        let id = self.id;
        self.call("Channel::getPaused", |b| b.channel_paused(id))
    }

    /// Set the paused flag.
    pub fn set_paused(&self, paused: bool) -> AudioResult<()> {
        let id = self.id;
        self
            .call("Channel::setPaused", |b| b.channel_set_paused(id, paused))
    }

    /// Stop playback.
    pub fn stop(&self) -> AudioResult<()> {
        let id = self.id;
        self.call("Channel::stop", |b| b.channel_stop(id))
    }

    /// Playback position in milliseconds.
    pub fn position_ms(&self) -> AudioResult<u32> {
        let id = self.id;
        self
            .call("Channel::getPosition", |b| b.channel_position_ms(id))
    }

    /// Seek to a position in milliseconds.
    pub fn set_position_ms(&self, position: u32) -> AudioResult<()> {
        let id = self.id;
        self.call("Channel::setPosition", |b| {
            b.channel_set_position_ms(id, position)
        })
    }

    /// Remaining loop count.
    pub fn loop_count(&self) -> AudioResult<i32> {
        let id = self.id;
        self
            .call("Channel::getLoopCount", |b| b.channel_loop_count(id))
    }

    /// Set the loop count.
    pub fn set_loop_count(&self, count: i32) -> AudioResult<()> {
        let id = self.id;
        self
            .call("Channel::setLoopCount", |b| b.channel_set_loop_count(id, count))
    }

    /// Linear volume.
    pub fn volume(&self) -> AudioResult<f32> {
        let id = self.id;
        self.call("Channel::getVolume", |b| b.channel_volume(id))
    }

    /// Set linear volume.
    pub fn set_volume(&self, volume: f32) -> AudioResult<()> {
        let id = self.id;
        self
            .call("Channel::setVolume", |b| b.channel_set_volume(id, volume))
    }

    /// Pitch multiplier.
    pub fn pitch(&self) -> AudioResult<f32> {
        let id = self.id;
        self.call("Channel::getPitch", |b| b.channel_pitch(id))
    }

    /// Set the pitch multiplier.
    pub fn set_pitch(&self, pitch: f32) -> AudioResult<()> {
        let id = self.id;
        self
            .call("Channel::setPitch", |b| b.channel_set_pitch(id, pitch))
    }

    /// Playback frequency in Hz.
    pub fn frequency(&self) -> AudioResult<f32> {
        let id = self.id;
        self
            .call("Channel::getFrequency", |b| b.channel_frequency(id))
    }

    /// Set the playback frequency.
    pub fn set_frequency(&self, frequency: f32) -> AudioResult<()> {
        let id = self.id;
        self.call("Channel::setFrequency", |b| {
            b.channel_set_frequency(id, frequency)
        })
    }

    /// Mute flag.
    pub fn mute(&self) -> AudioResult<bool> {
        let id = self.id;
        self.call("Channel::getMute", |b| b.channel_mute(id))
    }

    /// Set the mute flag.
    pub fn set_mute(&self, mute: bool) -> AudioResult<()> {
        let id = self.id;
        self
            .call("Channel::setMute", |b| b.channel_set_mute(id, mute))
    }

    /// 3D attributes.
    pub fn attributes_3d(&self) -> AudioResult<(Vec3, Vec3)> {
        let id = self.id;
        self
            .call("Channel::get3DAttributes", |b| b.channel_3d_attributes(id))
    }

    /// Set 3D attributes.
    pub fn set_attributes_3d(&self, position: Vec3, velocity: Vec3) -> AudioResult<()> {
        let id = self.id;
        self.call("Channel::set3DAttributes", |b| {
            b.channel_set_3d_attributes(id, position, velocity)
        })
    }

    /// Cone orientation.
    pub fn cone_orientation(&self) -> AudioResult<Vec3> {
        let id = self.id;
        self.call("Channel::get3DConeOrientation", |b| {
            b.channel_3d_cone_orientation(id)
        })
    }

    /// Set the cone orientation.
    pub fn set_cone_orientation(&self, orientation: Vec3) -> AudioResult<()> {
        let id = self.id;
        self.call("Channel::set3DConeOrientation", |b| {
            b.channel_set_3d_cone_orientation(id, orientation)
        })
    }

    /// Cone angles and outside volume.
    pub fn cone_settings(&self) -> AudioResult<ConeSettings> {
        let id = self.id;
        self
            .call("Channel::get3DConeSettings", |b| b.channel_3d_cone_settings(id))
    }

    /// Set cone angles and outside volume.
    pub fn set_cone_settings(&self, cone: ConeSettings) -> AudioResult<()> {
        let id = self.id;
        self.call("Channel::set3DConeSettings", |b| {
            b.channel_set_3d_cone_settings(id, cone)
        })
    }

    /// Attenuation distances.
    pub fn min_max_distance(&self) -> AudioResult<(f32, f32)> {
        let id = self.id;
        self.call("Channel::get3DMinMaxDistance", |b| {
            b.channel_3d_min_max_distance(id)
        })
    }

    /// Set attenuation distances.
    pub fn set_min_max_distance(&self, min: f32, max: f32) -> AudioResult<()> {
        let id = self.id;
        self.call("Channel::set3DMinMaxDistance", |b| {
            b.channel_set_3d_min_max_distance(id, min, max)
        })
    }

    /// Send level to a reverb instance.
    pub fn reverb_wet(&self, instance: usize) -> AudioResult<f32> {
        let id = self.id;
        self.call("Channel::getReverbProperties", |b| {
            b.channel_reverb_wet(id, instance)
        })
    }

    /// Set the send level to a reverb instance.
    pub fn set_reverb_wet(&self, instance: usize, wet: f32) -> AudioResult<()> {
        let id = self.id;
        self.call("Channel::setReverbProperties", |b| {
            b.channel_set_reverb_wet(id, instance, wet)
        })
    }

    /// Insert a DSP into the chain.
    pub fn add_dsp(&self, index: usize, dsp: DspId) -> AudioResult<()> {
        let id = self.id;
        self
            .call("Channel::addDSP", |b| b.channel_add_dsp(id, index, dsp))
    }

    /// DSP at a chain index.
    pub fn dsp(&self, index: usize) -> AudioResult<DspId> {
        let id = self.id;
        self.call("Channel::getDSP", |b| b.channel_dsp(id, index))
    }

    /// Length of the DSP chain.
    pub fn num_dsps(&self) -> AudioResult<usize> {
        let id = self.id;
        self.call("Channel::getNumDSPs", |b| b.channel_num_dsps(id))
    }

    /// Move to a group (`None` = master).
    pub fn set_group(&self, group: Option<ChannelGroupId>) -> AudioResult<()> {
        let id = self.id;
        self
            .call("Channel::setChannelGroup", |b| b.channel_set_group(id, group))
    }

    /// Owning group (`None` = master).
    pub fn group(&self) -> AudioResult<Option<ChannelGroupId>> {
        let id = self.id;
        self
            .call("Channel::getChannelGroup", |b| b.channel_group(id))
    }
}

/// Checked operations on one channel group.
#[derive(Debug, Clone, Copy)]
pub struct GroupCtl<'a> {
    system: &'a AudioSystem,
    id: ChannelGroupId,
}

impl GroupCtl<'_> {
    /// Stop playback.
    pub fn stop(&self) -> AudioResult<()> {
        let id = self.id;
        self.system.call("ChannelGroup::stop", |b| b.group_stop(id))
    }

    /// Paused flag.
    pub fn is_paused(&self) -> AudioResult<bool> {
        let id = self.id;
        self.system.call("ChannelGroup::getPaused", |b| b.group_paused(id))
    }

    /// Set the paused flag.
    pub fn set_paused(&self, paused: bool) -> AudioResult<()> {
        let id = self.id;
        self.system
            .call("ChannelGroup::setPaused", |b| b.group_set_paused(id, paused))
    }

    /// Whether any member channel is alive.
    pub fn is_playing(&self) -> AudioResult<bool> {
        let id = self.id;
        self.system
            .call("ChannelGroup::isPlaying", |b| b.group_is_playing(id))
    }

    /// Linear volume.
    pub fn volume(&self) -> AudioResult<f32> {
        let id = self.id;
        self.system.call("ChannelGroup::getVolume", |b| b.group_volume(id))
    }

    /// Set linear volume.
    pub fn set_volume(&self, volume: f32) -> AudioResult<()> {
        let id = self.id;
        self.system
            .call("ChannelGroup::setVolume", |b| b.group_set_volume(id, volume))
    }

    /// Mute flag.
    pub fn mute(&self) -> AudioResult<bool> {
        let id = self.id;
        self.system.call("ChannelGroup::getMute", |b| b.group_mute(id))
    }

    /// Set the mute flag.
    pub fn set_mute(&self, mute: bool) -> AudioResult<()> {
        let id = self.id;
        self.system
            .call("ChannelGroup::setMute", |b| b.group_set_mute(id, mute))
    }

    /// Pitch multiplier.
    pub fn pitch(&self) -> AudioResult<f32> {
        let id = self.id;
        self.system.call("ChannelGroup::getPitch", |b| b.group_pitch(id))
    }

    /// Set the pitch multiplier.
    pub fn set_pitch(&self, pitch: f32) -> AudioResult<()> {
        let id = self.id;
        self.system
            .call("ChannelGroup::setPitch", |b| b.group_set_pitch(id, pitch))
    }
}

/// Checked operations on one geometry object.
#[derive(Debug, Clone, Copy)]
pub struct GeometryCtl<'a> {
    system: &'a AudioSystem,
    id: GeometryId,
}

impl GeometryCtl<'_> {
    /// Add a polygon, returning its index.
    pub fn add_polygon(
        &self,
        direct: f32,
        reverb: f32,
        double_sided: bool,
        vertices: &[Vec3],
    ) -> AudioResult<usize> {
        let id = self.id;
        self.system.call("Geometry::addPolygon", |b| {
            b.geometry_add_polygon(id, direct, reverb, double_sided, vertices)
        })
    }

    /// Polygons added so far.
    pub fn num_polygons(&self) -> AudioResult<usize> {
        let id = self.id;
        self.system
            .call("Geometry::getNumPolygons", |b| b.geometry_num_polygons(id))
    }

    /// Declared capacity.
    pub fn max_polygons(&self) -> AudioResult<(usize, usize)> {
        let id = self.id;
        self.system
            .call("Geometry::getMaxPolygons", |b| b.geometry_max_polygons(id))
    }

    /// World position.
    pub fn position(&self) -> AudioResult<Vec3> {
        let id = self.id;
        self.system
            .call("Geometry::getPosition", |b| b.geometry_position(id))
    }

    /// Set the world position.
    pub fn set_position(&self, position: Vec3) -> AudioResult<()> {
        let id = self.id;
        self.system
            .call("Geometry::setPosition", |b| b.geometry_set_position(id, position))
    }

    /// Orientation as `(forward, up)`.
    pub fn rotation(&self) -> AudioResult<(Vec3, Vec3)> {
        let id = self.id;
        self.system
            .call("Geometry::getRotation", |b| b.geometry_rotation(id))
    }

    /// Set the orientation.
    pub fn set_rotation(&self, forward: Vec3, up: Vec3) -> AudioResult<()> {
        let id = self.id;
        self.system.call("Geometry::setRotation", |b| {
            b.geometry_set_rotation(id, forward, up)
        })
    }

    /// Scale.
    pub fn scale(&self) -> AudioResult<Vec3> {
        let id = self.id;
        self.system.call("Geometry::getScale", |b| b.geometry_scale(id))
    }

    /// Set the scale.
    pub fn set_scale(&self, scale: Vec3) -> AudioResult<()> {
        let id = self.id;
        self.system
            .call("Geometry::setScale", |b| b.geometry_set_scale(id, scale))
    }

    /// Active flag.
    pub fn is_active(&self) -> AudioResult<bool> {
        let id = self.id;
        self.system.call("Geometry::getActive", |b| b.geometry_active(id))
    }

    /// Set the active flag.
    pub fn set_active(&self, active: bool) -> AudioResult<()> {
        let id = self.id;
        self.system
            .call("Geometry::setActive", |b| b.geometry_set_active(id, active))
    }
}

/// Checked operations on one reverb region.
#[derive(Debug, Clone, Copy)]
pub struct ReverbCtl<'a> {
    system: &'a AudioSystem,
    id: ReverbId,
}

impl ReverbCtl<'_> {
    /// Reverb properties.
    pub fn properties(&self) -> AudioResult<ReverbProperties> {
        let id = self.id;
        self.system
            .call("Reverb3D::getProperties", |b| b.reverb_properties(id))
    }

    /// Replace reverb properties.
    pub fn set_properties(&self, properties: &ReverbProperties) -> AudioResult<()> {
        let id = self.id;
        self.system.call("Reverb3D::setProperties", |b| {
            b.reverb_set_properties(id, properties)
        })
    }

    /// 3D attributes.
    pub fn attributes_3d(&self) -> AudioResult<(Vec3, f32, f32)> {
        let id = self.id;
        self.system
            .call("Reverb3D::get3DAttributes", |b| b.reverb_3d_attributes(id))
    }

    /// Set 3D attributes.
    pub fn set_attributes_3d(&self, position: Vec3, min: f32, max: f32) -> AudioResult<()> {
        let id = self.id;
        self.system.call("Reverb3D::set3DAttributes", |b| {
            b.reverb_set_3d_attributes(id, position, min, max)
        })
    }

    /// Active flag.
    pub fn is_active(&self) -> AudioResult<bool> {
        let id = self.id;
        self.system.call("Reverb3D::getActive", |b| b.reverb_active(id))
    }

    /// Set the active flag.
    pub fn set_active(&self, active: bool) -> AudioResult<()> {
        let id = self.id;
        self.system
            .call("Reverb3D::setActive", |b| b.reverb_set_active(id, active))
    }
}

/// Checked operations on one DSP unit.
#[derive(Debug, Clone, Copy)]
pub struct DspCtl<'a> {
    system: &'a AudioSystem,
    id: DspId,
}

impl DspCtl<'_> {
    /// Effect type.
    pub fn kind(&self) -> AudioResult<DspType> {
        let id = self.id;
        self.system.call("DSP::getType", |b| b.dsp_type(id))
    }

    /// Read a float parameter.
    pub fn parameter(&self, index: usize) -> AudioResult<f32> {
        let id = self.id;
        self.system
            .call("DSP::getParameterFloat", |b| b.dsp_parameter(id, index))
    }

    /// Write a float parameter.
    pub fn set_parameter(&self, index: usize, value: f32) -> AudioResult<()> {
        let id = self.id;
        self.system.call("DSP::setParameterFloat", |b| {
            b.dsp_set_parameter(id, index, value)
        })
    }
}
