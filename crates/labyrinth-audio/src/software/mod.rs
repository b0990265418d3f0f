//! In-process software implementation of [`AudioBackend`].
//!
//! `SoftwareEngine` keeps the full object model of a low-level audio engine
//! without producing samples: a bounded channel pool with stealing, playback
//! clocks advanced by [`AudioBackend::update`], channel groups, DSP chains,
//! fixed-capacity occlusion geometry with line-of-sight queries, and 3D
//! reverb regions. It is the backend the engine binary runs on and the one
//! every test drives.

mod arena;
mod clips;
mod occlusion;

pub use clips::{ClipInfo, DEFAULT_FREQUENCY};

use std::path::{Path, PathBuf};

use glam::Vec3;
use tracing::{debug, info, warn};

use labyrinth_common::{
    ChannelGroupId, ChannelId, DspId, EngineCode, EngineResult, GeometryId, ReverbId, SoundId,
};

use crate::backend::{
    AudioBackend, ConeSettings, ListenerAttributes, Occlusion, Settings3D, SoundMode,
    LOOP_FOREVER, LOOP_ONCE, REVERB_INSTANCES,
};
use crate::dsp::DspType;
use crate::presets::ReverbProperties;

use arena::Arena;
use clips::ClipLibrary;
use occlusion::{Placement, Polygon};

/// Version reported by [`AudioBackend::version`].
pub const ENGINE_VERSION: u32 = 0x0001_0200;

/// Default size of the channel pool.
pub const DEFAULT_MAX_CHANNELS: usize = 64;

/// Channel pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareConfig {
    /// Maximum simultaneously allocated channels.
    pub max_channels: usize,
    /// Steal the oldest channel when the pool is full instead of failing.
    pub steal_channels: bool,
}

impl Default for SoftwareConfig {
    fn default() -> Self {
        Self {
            max_channels: DEFAULT_MAX_CHANNELS,
            steal_channels: true,
        }
    }
}

#[derive(Debug)]
struct SoundData {
    path: PathBuf,
    clip: ClipInfo,
    mode: SoundMode,
}

#[derive(Debug)]
struct ChannelData {
    sound: SoundId,
    length_ms: Option<u32>,
    base_frequency: f32,
    looping_allowed: bool,
    group: Option<ChannelGroupId>,
    sequence: u64,
    paused: bool,
    position_ms: f64,
    loop_count: i32,
    volume: f32,
    pitch: f32,
    frequency: f32,
    mute: bool,
    position: Vec3,
    velocity: Vec3,
    cone_orientation: Vec3,
    cone: ConeSettings,
    min_distance: f32,
    max_distance: f32,
    reverb_wet: [f32; REVERB_INSTANCES],
    dsps: Vec<DspId>,
}

impl ChannelData {
    /// Advance the playback clock. Returns `true` once a non-looping channel ends.
    fn advance(&mut self, elapsed_ms: f64) -> bool {
        self.position_ms += elapsed_ms;
        let Some(length) = self.length_ms.filter(|l| *l > 0).map(f64::from) else {
            return false;
        };
        while self.position_ms >= length {
            if self.looping_allowed && self.loop_count == LOOP_FOREVER {
                self.position_ms -= length;
            } else if self.looping_allowed && self.loop_count > 0 {
                self.loop_count -= 1;
                self.position_ms -= length;
            } else {
                return true;
            }
        }
        false
    }
}

#[derive(Debug)]
struct GroupData {
    name: String,
    paused: bool,
    volume: f32,
    mute: bool,
    pitch: f32,
}

#[derive(Debug)]
struct DspData {
    kind: DspType,
    parameters: Vec<f32>,
}

#[derive(Debug)]
struct GeometryData {
    max_polygons: usize,
    max_vertices: usize,
    vertex_count: usize,
    polygons: Vec<Polygon>,
    placement: Placement,
    active: bool,
}

#[derive(Debug)]
struct ReverbData {
    properties: ReverbProperties,
    position: Vec3,
    min_distance: f32,
    max_distance: f32,
    active: bool,
}

/// Software audio engine.
#[derive(Debug)]
pub struct SoftwareEngine {
    config: SoftwareConfig,
    clips: ClipLibrary,
    sounds: Arena<SoundData>,
    channels: Arena<ChannelData>,
    groups: Arena<GroupData>,
    dsps: Arena<DspData>,
    geometries: Arena<GeometryData>,
    reverbs: Arena<ReverbData>,
    settings: Settings3D,
    listener: ListenerAttributes,
    next_sequence: u64,
}

impl Default for SoftwareEngine {
    fn default() -> Self {
        Self::new(SoftwareConfig::default())
    }
}

macro_rules! lookup {
    ($arena:expr, $id:expr) => {
        $arena
            .get($id.index(), $id.generation())
            .ok_or(EngineCode::InvalidHandle)
    };
}

macro_rules! lookup_mut {
    ($arena:expr, $id:expr) => {
        $arena
            .get_mut($id.index(), $id.generation())
            .ok_or(EngineCode::InvalidHandle)
    };
}

fn finite(value: f32) -> EngineResult<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineCode::InvalidParam)
    }
}

fn finite_vec(value: Vec3) -> EngineResult<Vec3> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineCode::InvalidParam)
    }
}

impl SoftwareEngine {
    /// Create an engine with the given channel pool.
    #[must_use]
    pub fn new(config: SoftwareConfig) -> Self {
        info!(
            "Software audio engine initialized ({} channels, stealing {})",
            config.max_channels,
            if config.steal_channels { "on" } else { "off" }
        );
        Self {
            config,
            clips: ClipLibrary::default(),
            sounds: Arena::default(),
            channels: Arena::default(),
            groups: Arena::default(),
            dsps: Arena::default(),
            geometries: Arena::default(),
            reverbs: Arena::default(),
            settings: Settings3D::default(),
            listener: ListenerAttributes::default(),
            next_sequence: 0,
        }
    }

    /// Register an in-memory clip under a resolved asset path.
    pub fn register_clip(&mut self, path: impl Into<PathBuf>, info: ClipInfo) {
        self.clips.register(path.into(), info);
    }

    /// Builder form of [`Self::register_clip`].
    #[must_use]
    pub fn with_clip(mut self, path: impl Into<PathBuf>, info: ClipInfo) -> Self {
        self.register_clip(path, info);
        self
    }

    /// Number of allocated channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of live geometry objects.
    #[must_use]
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Number of live reverb regions.
    #[must_use]
    pub fn reverb_count(&self) -> usize {
        self.reverbs.len()
    }

    /// Pool configuration.
    #[must_use]
    pub const fn config(&self) -> &SoftwareConfig {
        &self.config
    }

    fn channel(&self, id: ChannelId) -> EngineResult<&ChannelData> {
        lookup!(self.channels, id)
    }

    fn channel_mut(&mut self, id: ChannelId) -> EngineResult<&mut ChannelData> {
        lookup_mut!(self.channels, id)
    }

    fn group(&self, id: ChannelGroupId) -> EngineResult<&GroupData> {
        lookup!(self.groups, id)
    }

    fn group_mut(&mut self, id: ChannelGroupId) -> EngineResult<&mut GroupData> {
        lookup_mut!(self.groups, id)
    }

    fn geometry(&self, id: GeometryId) -> EngineResult<&GeometryData> {
        lookup!(self.geometries, id)
    }

    fn geometry_mut(&mut self, id: GeometryId) -> EngineResult<&mut GeometryData> {
        lookup_mut!(self.geometries, id)
    }

    fn reverb(&self, id: ReverbId) -> EngineResult<&ReverbData> {
        lookup!(self.reverbs, id)
    }

    fn reverb_mut(&mut self, id: ReverbId) -> EngineResult<&mut ReverbData> {
        lookup_mut!(self.reverbs, id)
    }

    /// Free a slot for a new channel, stealing the oldest one if allowed.
    fn reserve_channel_slot(&mut self) -> EngineResult<()> {
        if self.channels.len() < self.config.max_channels {
            return Ok(());
        }
        if !self.config.steal_channels || self.config.max_channels == 0 {
            return Err(EngineCode::ChannelAlloc);
        }
        let oldest = self
            .channels
            .iter()
            .min_by_key(|(_, _, ch)| ch.sequence)
            .map(|(index, generation, _)| (index, generation));
        match oldest {
            Some((index, generation)) => {
                self.channels.remove(index, generation);
                debug!("Stole channel {}", ChannelId::new(index, generation));
                Ok(())
            },
            None => Err(EngineCode::ChannelAlloc),
        }
    }
}

impl AudioBackend for SoftwareEngine {
    fn version(&self) -> EngineResult<u32> {
        Ok(ENGINE_VERSION)
    }

    fn update(&mut self, dt: f32) -> EngineResult<()> {
        let dt = finite(dt)?;
        if dt < 0.0 {
            return Err(EngineCode::InvalidParam);
        }
        let elapsed_ms = f64::from(dt) * 1000.0;

        let mut finished = Vec::new();
        for (index, generation, channel) in self.channels.iter_mut() {
            let (group_paused, group_pitch) = channel
                .group
                .and_then(|g| self.groups.get(g.index(), g.generation()))
                .map_or((false, 1.0), |g| (g.paused, g.pitch));
            if channel.paused || group_paused {
                continue;
            }
            let rate = f64::from(channel.pitch * group_pitch)
                * f64::from(channel.frequency / channel.base_frequency);
            if channel.advance(elapsed_ms * rate) {
                finished.push((index, generation));
            }
        }
        for (index, generation) in finished {
            self.channels.remove(index, generation);
            debug!("Channel {} finished", ChannelId::new(index, generation));
        }
        Ok(())
    }

    fn set_3d_settings(&mut self, settings: Settings3D) -> EngineResult<()> {
        let valid = [
            settings.doppler_scale,
            settings.distance_factor,
            settings.rolloff_scale,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
        if !valid || settings.distance_factor <= 0.0 {
            return Err(EngineCode::InvalidParam);
        }
        self.settings = settings;
        Ok(())
    }

    fn settings_3d(&self) -> EngineResult<Settings3D> {
        Ok(self.settings)
    }

    fn set_listener(&mut self, listener: ListenerAttributes) -> EngineResult<()> {
        finite_vec(listener.position)?;
        finite_vec(listener.velocity)?;
        self.listener = listener;
        Ok(())
    }

    fn listener(&self) -> EngineResult<ListenerAttributes> {
        Ok(self.listener)
    }

    fn create_sound(&mut self, path: &Path, mode: SoundMode) -> EngineResult<SoundId> {
        let clip = self.clips.resolve(path)?;
        let (index, generation) = self.sounds.insert(SoundData {
            path: path.to_path_buf(),
            clip,
            mode,
        });
        debug!("Created sound {} from {}", SoundId::new(index, generation), path.display());
        Ok(SoundId::new(index, generation))
    }

    fn sound_length_ms(&self, sound: SoundId) -> EngineResult<Option<u32>> {
        Ok(lookup!(self.sounds, sound)?.clip.length_ms)
    }

    fn release_sound(&mut self, sound: SoundId) -> EngineResult<()> {
        let data = self
            .sounds
            .remove(sound.index(), sound.generation())
            .ok_or(EngineCode::InvalidHandle)?;
        self.channels.retain(|ch| ch.sound != sound);
        debug!("Released sound {}", data.path.display());
        Ok(())
    }

    fn play_sound(
        &mut self,
        sound: SoundId,
        group: Option<ChannelGroupId>,
        paused: bool,
    ) -> EngineResult<ChannelId> {
        let (clip, mode) = {
            let data = lookup!(self.sounds, sound)?;
            (data.clip, data.mode)
        };
        if let Some(g) = group {
            self.group(g)?;
        }
        self.reserve_channel_slot()?;

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let (index, generation) = self.channels.insert(ChannelData {
            sound,
            length_ms: clip.length_ms,
            base_frequency: clip.frequency,
            looping_allowed: mode.looping,
            group,
            sequence,
            paused,
            position_ms: 0.0,
            loop_count: LOOP_ONCE,
            volume: 1.0,
            pitch: 1.0,
            frequency: clip.frequency,
            mute: false,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            cone_orientation: Vec3::Z,
            cone: ConeSettings::default(),
            min_distance: 1.0,
            max_distance: 10_000.0,
            reverb_wet: [1.0; REVERB_INSTANCES],
            dsps: Vec::new(),
        });
        Ok(ChannelId::new(index, generation))
    }

    fn channel_is_playing(&self, channel: ChannelId) -> EngineResult<bool> {
        self.channel(channel).map(|_| true)
    }

    fn channel_stop(&mut self, channel: ChannelId) -> EngineResult<()> {
        self.channels
            .remove(channel.index(), channel.generation())
            .map(|_| ())
            .ok_or(EngineCode::InvalidHandle)
    }

    fn channel_paused(&self, channel: ChannelId) -> EngineResult<bool> {
        Ok(self.channel(channel)?.paused)
    }

    fn channel_set_paused(&mut self, channel: ChannelId, paused: bool) -> EngineResult<()> {
        self.channel_mut(channel)?.paused = paused;
        Ok(())
    }

    fn channel_position_ms(&self, channel: ChannelId) -> EngineResult<u32> {
        let position = self.channel(channel)?.position_ms;
        Ok(position.max(0.0) as u32)
    }

    fn channel_set_position_ms(&mut self, channel: ChannelId, position: u32) -> EngineResult<()> {
        let ch = self.channel_mut(channel)?;
        if ch.length_ms.is_some_and(|len| position > len) {
            return Err(EngineCode::InvalidParam);
        }
        ch.position_ms = f64::from(position);
        Ok(())
    }

    fn channel_loop_count(&self, channel: ChannelId) -> EngineResult<i32> {
        Ok(self.channel(channel)?.loop_count)
    }

    fn channel_set_loop_count(&mut self, channel: ChannelId, count: i32) -> EngineResult<()> {
        if count < LOOP_FOREVER {
            return Err(EngineCode::InvalidParam);
        }
        self.channel_mut(channel)?.loop_count = count;
        Ok(())
    }

    fn channel_volume(&self, channel: ChannelId) -> EngineResult<f32> {
        Ok(self.channel(channel)?.volume)
    }

    fn channel_set_volume(&mut self, channel: ChannelId, volume: f32) -> EngineResult<()> {
        let volume = finite(volume)?;
        self.channel_mut(channel)?.volume = volume;
        Ok(())
    }

    fn channel_pitch(&self, channel: ChannelId) -> EngineResult<f32> {
        Ok(self.channel(channel)?.pitch)
    }

    fn channel_set_pitch(&mut self, channel: ChannelId, pitch: f32) -> EngineResult<()> {
        let pitch = finite(pitch)?;
        if pitch < 0.0 {
            return Err(EngineCode::InvalidParam);
        }
        self.channel_mut(channel)?.pitch = pitch;
        Ok(())
    }

    fn channel_frequency(&self, channel: ChannelId) -> EngineResult<f32> {
        Ok(self.channel(channel)?.frequency)
    }

    fn channel_set_frequency(&mut self, channel: ChannelId, frequency: f32) -> EngineResult<()> {
        let frequency = finite(frequency)?;
        if frequency <= 0.0 {
            return Err(EngineCode::InvalidParam);
        }
        self.channel_mut(channel)?.frequency = frequency;
        Ok(())
    }

    fn channel_mute(&self, channel: ChannelId) -> EngineResult<bool> {
        Ok(self.channel(channel)?.mute)
    }

    fn channel_set_mute(&mut self, channel: ChannelId, mute: bool) -> EngineResult<()> {
        self.channel_mut(channel)?.mute = mute;
        Ok(())
    }

    fn channel_3d_attributes(&self, channel: ChannelId) -> EngineResult<(Vec3, Vec3)> {
        let ch = self.channel(channel)?;
        Ok((ch.position, ch.velocity))
    }

    fn channel_set_3d_attributes(
        &mut self,
        channel: ChannelId,
        position: Vec3,
        velocity: Vec3,
    ) -> EngineResult<()> {
        let position = finite_vec(position)?;
        let velocity = finite_vec(velocity)?;
        let ch = self.channel_mut(channel)?;
        ch.position = position;
        ch.velocity = velocity;
        Ok(())
    }

    fn channel_3d_cone_orientation(&self, channel: ChannelId) -> EngineResult<Vec3> {
        Ok(self.channel(channel)?.cone_orientation)
    }

    fn channel_set_3d_cone_orientation(
        &mut self,
        channel: ChannelId,
        orientation: Vec3,
    ) -> EngineResult<()> {
        let orientation = finite_vec(orientation)?;
        self.channel_mut(channel)?.cone_orientation = orientation;
        Ok(())
    }

    fn channel_3d_cone_settings(&self, channel: ChannelId) -> EngineResult<ConeSettings> {
        Ok(self.channel(channel)?.cone)
    }

    fn channel_set_3d_cone_settings(
        &mut self,
        channel: ChannelId,
        cone: ConeSettings,
    ) -> EngineResult<()> {
        let angles_ok = (0.0..=360.0).contains(&cone.inside_angle)
            && (0.0..=360.0).contains(&cone.outside_angle)
            && cone.inside_angle <= cone.outside_angle;
        if !angles_ok || !(0.0..=1.0).contains(&cone.outside_volume) {
            return Err(EngineCode::InvalidParam);
        }
        self.channel_mut(channel)?.cone = cone;
        Ok(())
    }

    fn channel_3d_min_max_distance(&self, channel: ChannelId) -> EngineResult<(f32, f32)> {
        let ch = self.channel(channel)?;
        Ok((ch.min_distance, ch.max_distance))
    }

    fn channel_set_3d_min_max_distance(
        &mut self,
        channel: ChannelId,
        min: f32,
        max: f32,
    ) -> EngineResult<()> {
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
            return Err(EngineCode::InvalidParam);
        }
        let ch = self.channel_mut(channel)?;
        ch.min_distance = min;
        ch.max_distance = max;
        Ok(())
    }

    fn channel_reverb_wet(&self, channel: ChannelId, instance: usize) -> EngineResult<f32> {
        self.channel(channel)?
            .reverb_wet
            .get(instance)
            .copied()
            .ok_or(EngineCode::InvalidParam)
    }

    fn channel_set_reverb_wet(
        &mut self,
        channel: ChannelId,
        instance: usize,
        wet: f32,
    ) -> EngineResult<()> {
        let wet = finite(wet)?;
        let slot = self
            .channel_mut(channel)?
            .reverb_wet
            .get_mut(instance)
            .ok_or(EngineCode::InvalidParam)?;
        *slot = wet;
        Ok(())
    }

    fn channel_add_dsp(
        &mut self,
        channel: ChannelId,
        index: usize,
        dsp: DspId,
    ) -> EngineResult<()> {
        lookup!(self.dsps, dsp)?;
        let ch = self.channel_mut(channel)?;
        if index > ch.dsps.len() || ch.dsps.contains(&dsp) {
            return Err(EngineCode::InvalidParam);
        }
        ch.dsps.insert(index, dsp);
        Ok(())
    }

    fn channel_dsp(&self, channel: ChannelId, index: usize) -> EngineResult<DspId> {
        self.channel(channel)?
            .dsps
            .get(index)
            .copied()
            .ok_or(EngineCode::InvalidParam)
    }

    fn channel_num_dsps(&self, channel: ChannelId) -> EngineResult<usize> {
        Ok(self.channel(channel)?.dsps.len())
    }

    fn channel_set_group(
        &mut self,
        channel: ChannelId,
        group: Option<ChannelGroupId>,
    ) -> EngineResult<()> {
        if let Some(g) = group {
            self.group(g)?;
        }
        self.channel_mut(channel)?.group = group;
        Ok(())
    }

    fn channel_group(&self, channel: ChannelId) -> EngineResult<Option<ChannelGroupId>> {
        Ok(self.channel(channel)?.group)
    }

    fn create_channel_group(&mut self, name: &str) -> EngineResult<ChannelGroupId> {
        let (index, generation) = self.groups.insert(GroupData {
            name: name.to_string(),
            paused: false,
            volume: 1.0,
            mute: false,
            pitch: 1.0,
        });
        debug!("Created channel group '{name}'");
        Ok(ChannelGroupId::new(index, generation))
    }

    fn release_channel_group(&mut self, group: ChannelGroupId) -> EngineResult<()> {
        let data = self
            .groups
            .remove(group.index(), group.generation())
            .ok_or(EngineCode::InvalidHandle)?;
        for (_, _, channel) in self.channels.iter_mut() {
            if channel.group == Some(group) {
                channel.group = None;
            }
        }
        debug!("Released channel group '{}'", data.name);
        Ok(())
    }

    fn group_stop(&mut self, group: ChannelGroupId) -> EngineResult<()> {
        self.group(group)?;
        self.channels.retain(|ch| ch.group != Some(group));
        Ok(())
    }

    fn group_paused(&self, group: ChannelGroupId) -> EngineResult<bool> {
        Ok(self.group(group)?.paused)
    }

    fn group_set_paused(&mut self, group: ChannelGroupId, paused: bool) -> EngineResult<()> {
        self.group_mut(group)?.paused = paused;
        Ok(())
    }

    fn group_is_playing(&self, group: ChannelGroupId) -> EngineResult<bool> {
        self.group(group)?;
        Ok(self
            .channels
            .iter()
            .any(|(_, _, ch)| ch.group == Some(group)))
    }

    fn group_volume(&self, group: ChannelGroupId) -> EngineResult<f32> {
        Ok(self.group(group)?.volume)
    }

    fn group_set_volume(&mut self, group: ChannelGroupId, volume: f32) -> EngineResult<()> {
        let volume = finite(volume)?;
        self.group_mut(group)?.volume = volume;
        Ok(())
    }

    fn group_mute(&self, group: ChannelGroupId) -> EngineResult<bool> {
        Ok(self.group(group)?.mute)
    }

    fn group_set_mute(&mut self, group: ChannelGroupId, mute: bool) -> EngineResult<()> {
        self.group_mut(group)?.mute = mute;
        Ok(())
    }

    fn group_pitch(&self, group: ChannelGroupId) -> EngineResult<f32> {
        Ok(self.group(group)?.pitch)
    }

    fn group_set_pitch(&mut self, group: ChannelGroupId, pitch: f32) -> EngineResult<()> {
        let pitch = finite(pitch)?;
        if pitch < 0.0 {
            return Err(EngineCode::InvalidParam);
        }
        self.group_mut(group)?.pitch = pitch;
        Ok(())
    }

    fn create_dsp(&mut self, kind: DspType) -> EngineResult<DspId> {
        let (index, generation) = self.dsps.insert(DspData {
            kind,
            parameters: kind.default_parameters(),
        });
        Ok(DspId::new(index, generation))
    }

    fn release_dsp(&mut self, dsp: DspId) -> EngineResult<()> {
        self.dsps
            .remove(dsp.index(), dsp.generation())
            .ok_or(EngineCode::InvalidHandle)?;
        for (_, _, channel) in self.channels.iter_mut() {
            channel.dsps.retain(|d| *d != dsp);
        }
        Ok(())
    }

    fn dsp_type(&self, dsp: DspId) -> EngineResult<DspType> {
        Ok(lookup!(self.dsps, dsp)?.kind)
    }

    fn dsp_parameter(&self, dsp: DspId, index: usize) -> EngineResult<f32> {
        lookup!(self.dsps, dsp)?
            .parameters
            .get(index)
            .copied()
            .ok_or(EngineCode::InvalidParam)
    }

    fn dsp_set_parameter(&mut self, dsp: DspId, index: usize, value: f32) -> EngineResult<()> {
        let data = lookup_mut!(self.dsps, dsp)?;
        let desc = data
            .kind
            .parameters()
            .get(index)
            .ok_or(EngineCode::InvalidParam)?;
        if !value.is_finite() || value < desc.min || value > desc.max {
            return Err(EngineCode::InvalidParam);
        }
        data.parameters[index] = value;
        Ok(())
    }

    fn create_geometry(
        &mut self,
        max_polygons: usize,
        max_vertices: usize,
    ) -> EngineResult<GeometryId> {
        if max_polygons == 0 || max_vertices < 3 {
            return Err(EngineCode::InvalidParam);
        }
        let (index, generation) = self.geometries.insert(GeometryData {
            max_polygons,
            max_vertices,
            vertex_count: 0,
            polygons: Vec::with_capacity(max_polygons),
            placement: Placement {
                position: Vec3::ZERO,
                forward: Vec3::Z,
                up: Vec3::Y,
                scale: Vec3::ONE,
            },
            active: true,
        });
        Ok(GeometryId::new(index, generation))
    }

    fn geometry_add_polygon(
        &mut self,
        geometry: GeometryId,
        direct_occlusion: f32,
        reverb_occlusion: f32,
        double_sided: bool,
        vertices: &[Vec3],
    ) -> EngineResult<usize> {
        if vertices.len() < 3 || vertices.iter().any(|v| !v.is_finite()) {
            return Err(EngineCode::InvalidParam);
        }
        let geo = self.geometry_mut(geometry)?;
        if geo.polygons.len() >= geo.max_polygons
            || geo.vertex_count + vertices.len() > geo.max_vertices
        {
            warn!(
                "Geometry {geometry} full ({} / {} polygons, {} / {} vertices)",
                geo.polygons.len(),
                geo.max_polygons,
                geo.vertex_count,
                geo.max_vertices
            );
            return Err(EngineCode::GeometryFull);
        }
        geo.vertex_count += vertices.len();
        geo.polygons.push(Polygon {
            direct: direct_occlusion,
            reverb: reverb_occlusion,
            double_sided,
            vertices: vertices.to_vec(),
        });
        Ok(geo.polygons.len() - 1)
    }

    fn geometry_num_polygons(&self, geometry: GeometryId) -> EngineResult<usize> {
        Ok(self.geometry(geometry)?.polygons.len())
    }

    fn geometry_max_polygons(&self, geometry: GeometryId) -> EngineResult<(usize, usize)> {
        let geo = self.geometry(geometry)?;
        Ok((geo.max_polygons, geo.max_vertices))
    }

    fn geometry_position(&self, geometry: GeometryId) -> EngineResult<Vec3> {
        Ok(self.geometry(geometry)?.placement.position)
    }

    fn geometry_set_position(&mut self, geometry: GeometryId, position: Vec3) -> EngineResult<()> {
        let position = finite_vec(position)?;
        self.geometry_mut(geometry)?.placement.position = position;
        Ok(())
    }

    fn geometry_rotation(&self, geometry: GeometryId) -> EngineResult<(Vec3, Vec3)> {
        let placement = self.geometry(geometry)?.placement;
        Ok((placement.forward, placement.up))
    }

    fn geometry_set_rotation(
        &mut self,
        geometry: GeometryId,
        forward: Vec3,
        up: Vec3,
    ) -> EngineResult<()> {
        let forward = finite_vec(forward)?;
        let up = finite_vec(up)?;
        if forward.length_squared() < 1e-12 || up.length_squared() < 1e-12 {
            return Err(EngineCode::InvalidParam);
        }
        let placement = &mut self.geometry_mut(geometry)?.placement;
        placement.forward = forward.normalize();
        placement.up = up.normalize();
        Ok(())
    }

    fn geometry_scale(&self, geometry: GeometryId) -> EngineResult<Vec3> {
        Ok(self.geometry(geometry)?.placement.scale)
    }

    fn geometry_set_scale(&mut self, geometry: GeometryId, scale: Vec3) -> EngineResult<()> {
        let scale = finite_vec(scale)?;
        self.geometry_mut(geometry)?.placement.scale = scale;
        Ok(())
    }

    fn geometry_active(&self, geometry: GeometryId) -> EngineResult<bool> {
        Ok(self.geometry(geometry)?.active)
    }

    fn geometry_set_active(&mut self, geometry: GeometryId, active: bool) -> EngineResult<()> {
        self.geometry_mut(geometry)?.active = active;
        Ok(())
    }

    fn release_geometry(&mut self, geometry: GeometryId) -> EngineResult<()> {
        self.geometries
            .remove(geometry.index(), geometry.generation())
            .map(|_| ())
            .ok_or(EngineCode::InvalidHandle)
    }

    fn geometry_occlusion(&self, listener: Vec3, source: Vec3) -> EngineResult<Occlusion> {
        let listener = finite_vec(listener)?;
        let source = finite_vec(source)?;
        let hits: Vec<&Polygon> = self
            .geometries
            .iter()
            .filter(|(_, _, geo)| geo.active)
            .flat_map(|(_, _, geo)| {
                geo.polygons
                    .iter()
                    .filter(move |poly| occlusion::blocks(poly, &geo.placement, listener, source))
            })
            .collect();
        Ok(Occlusion {
            direct: occlusion::combine(hits.iter().map(|p| p.direct)),
            reverb: occlusion::combine(hits.iter().map(|p| p.reverb)),
        })
    }

    fn create_reverb(&mut self) -> EngineResult<ReverbId> {
        let (index, generation) = self.reverbs.insert(ReverbData {
            properties: ReverbProperties::default(),
            position: Vec3::ZERO,
            min_distance: 0.0,
            max_distance: 0.0,
            active: true,
        });
        Ok(ReverbId::new(index, generation))
    }

    fn reverb_properties(&self, reverb: ReverbId) -> EngineResult<ReverbProperties> {
        Ok(self.reverb(reverb)?.properties)
    }

    fn reverb_set_properties(
        &mut self,
        reverb: ReverbId,
        properties: &ReverbProperties,
    ) -> EngineResult<()> {
        self.reverb_mut(reverb)?.properties = *properties;
        Ok(())
    }

    fn reverb_3d_attributes(&self, reverb: ReverbId) -> EngineResult<(Vec3, f32, f32)> {
        let data = self.reverb(reverb)?;
        Ok((data.position, data.min_distance, data.max_distance))
    }

    fn reverb_set_3d_attributes(
        &mut self,
        reverb: ReverbId,
        position: Vec3,
        min_distance: f32,
        max_distance: f32,
    ) -> EngineResult<()> {
        let position = finite_vec(position)?;
        let data = self.reverb_mut(reverb)?;
        data.position = position;
        data.min_distance = min_distance;
        data.max_distance = max_distance;
        Ok(())
    }

    fn reverb_active(&self, reverb: ReverbId) -> EngineResult<bool> {
        Ok(self.reverb(reverb)?.active)
    }

    fn reverb_set_active(&mut self, reverb: ReverbId, active: bool) -> EngineResult<()> {
        self.reverb_mut(reverb)?.active = active;
        Ok(())
    }

    fn release_reverb(&mut self, reverb: ReverbId) -> EngineResult<()> {
        self.reverbs
            .remove(reverb.index(), reverb.generation())
            .map(|_| ())
            .ok_or(EngineCode::InvalidHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(length_ms: u32, config: SoftwareConfig) -> (SoftwareEngine, SoundId) {
        let mut engine = SoftwareEngine::new(config).with_clip("a.wav", ClipInfo::with_length(length_ms));
        let sound = engine
            .create_sound(Path::new("a.wav"), SoundMode::POSITIONAL_LOOP)
            .expect("registered clip");
        (engine, sound)
    }

    #[test]
    fn test_channel_starts_paused_and_once() {
        let (mut engine, sound) = engine_with(1000, SoftwareConfig::default());
        let ch = engine.play_sound(sound, None, true).expect("slot");
        assert_eq!(engine.channel_paused(ch), Ok(true));
        assert_eq!(engine.channel_loop_count(ch), Ok(LOOP_ONCE));
        engine.update(5.0).expect("update");
        assert_eq!(engine.channel_position_ms(ch), Ok(0));
    }

    #[test]
    fn test_non_looping_channel_finishes() {
        let (mut engine, sound) = engine_with(100, SoftwareConfig::default());
        let ch = engine.play_sound(sound, None, false).expect("slot");
        engine.update(0.05).expect("update");
        assert_eq!(engine.channel_is_playing(ch), Ok(true));
        engine.update(0.06).expect("update");
        assert_eq!(engine.channel_is_playing(ch), Err(EngineCode::InvalidHandle));
        assert_eq!(engine.channel_count(), 0);
    }

    #[test]
    fn test_looping_channel_wraps() {
        let (mut engine, sound) = engine_with(100, SoftwareConfig::default());
        let ch = engine.play_sound(sound, None, false).expect("slot");
        engine.channel_set_loop_count(ch, LOOP_FOREVER).expect("loop");
        engine.update(0.25).expect("update");
        assert_eq!(engine.channel_position_ms(ch), Ok(50));
    }

    #[test]
    fn test_finite_loop_count_runs_down() {
        let (mut engine, sound) = engine_with(100, SoftwareConfig::default());
        let ch = engine.play_sound(sound, None, false).expect("slot");
        engine.channel_set_loop_count(ch, 1).expect("loop");
        engine.update(0.15).expect("update");
        assert_eq!(engine.channel_loop_count(ch), Ok(0));
        engine.update(0.1).expect("update");
        assert!(engine.channel_is_playing(ch).is_err());
    }

    #[test]
    fn test_pitch_and_group_pause_scale_clock() {
        let (mut engine, sound) = engine_with(10_000, SoftwareConfig::default());
        let group = engine.create_channel_group("sfx").expect("group");
        let ch = engine.play_sound(sound, Some(group), false).expect("slot");
        engine.channel_set_pitch(ch, 2.0).expect("pitch");
        engine.update(0.1).expect("update");
        assert_eq!(engine.channel_position_ms(ch), Ok(200));

        engine.group_set_paused(group, true).expect("pause");
        engine.update(0.1).expect("update");
        assert_eq!(engine.channel_position_ms(ch), Ok(200));
    }

    #[test]
    fn test_full_pool_steals_oldest() {
        let config = SoftwareConfig {
            max_channels: 2,
            steal_channels: true,
        };
        let (mut engine, sound) = engine_with(1000, config);
        let first = engine.play_sound(sound, None, true).expect("slot");
        let second = engine.play_sound(sound, None, true).expect("slot");
        let third = engine.play_sound(sound, None, true).expect("stolen slot");
        assert_eq!(engine.channel_is_playing(first), Err(EngineCode::InvalidHandle));
        assert_eq!(engine.channel_is_playing(second), Ok(true));
        assert_eq!(engine.channel_is_playing(third), Ok(true));
    }

    #[test]
    fn test_full_pool_without_stealing_fails() {
        let config = SoftwareConfig {
            max_channels: 1,
            steal_channels: false,
        };
        let (mut engine, sound) = engine_with(1000, config);
        engine.play_sound(sound, None, true).expect("slot");
        assert_eq!(engine.play_sound(sound, None, true), Err(EngineCode::ChannelAlloc));
    }

    #[test]
    fn test_group_stop_invalidates_members() {
        let (mut engine, sound) = engine_with(1000, SoftwareConfig::default());
        let group = engine.create_channel_group("g").expect("group");
        let inside = engine.play_sound(sound, Some(group), true).expect("slot");
        let outside = engine.play_sound(sound, None, true).expect("slot");
        assert_eq!(engine.group_is_playing(group), Ok(true));
        engine.group_stop(group).expect("stop");
        assert!(engine.channel_is_playing(inside).is_err());
        assert_eq!(engine.channel_is_playing(outside), Ok(true));
        assert_eq!(engine.group_is_playing(group), Ok(false));
    }

    #[test]
    fn test_dsp_chain_order_and_release() {
        let (mut engine, sound) = engine_with(1000, SoftwareConfig::default());
        let ch = engine.play_sound(sound, None, true).expect("slot");
        let a = engine.create_dsp(DspType::Distortion).expect("dsp");
        let b = engine.create_dsp(DspType::Highpass).expect("dsp");
        engine.channel_add_dsp(ch, 0, a).expect("add");
        engine.channel_add_dsp(ch, 1, b).expect("add");
        assert_eq!(engine.channel_add_dsp(ch, 5, a), Err(EngineCode::InvalidParam));
        assert_eq!(engine.channel_dsp(ch, 1), Ok(b));
        engine.release_dsp(a).expect("release");
        assert_eq!(engine.channel_num_dsps(ch), Ok(1));
        assert_eq!(engine.channel_dsp(ch, 0), Ok(b));
    }

    #[test]
    fn test_dsp_parameter_range() {
        let mut engine = SoftwareEngine::default();
        let dsp = engine.create_dsp(DspType::Highpass).expect("dsp");
        engine
            .dsp_set_parameter(dsp, crate::dsp::highpass::CUTOFF, 2000.0)
            .expect("in range");
        assert_eq!(engine.dsp_parameter(dsp, crate::dsp::highpass::CUTOFF), Ok(2000.0));
        assert_eq!(
            engine.dsp_set_parameter(dsp, crate::dsp::highpass::CUTOFF, 50_000.0),
            Err(EngineCode::InvalidParam)
        );
        assert_eq!(engine.dsp_set_parameter(dsp, 9, 1.0), Err(EngineCode::InvalidParam));
    }

    #[test]
    fn test_geometry_capacity_is_enforced() {
        let mut engine = SoftwareEngine::default();
        let geo = engine.create_geometry(1, 3).expect("geometry");
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        assert_eq!(engine.geometry_add_polygon(geo, 1.0, 1.0, true, &tri), Ok(0));
        assert_eq!(
            engine.geometry_add_polygon(geo, 1.0, 1.0, true, &tri),
            Err(EngineCode::GeometryFull)
        );
        assert_eq!(engine.geometry_num_polygons(geo), Ok(1));
    }

    #[test]
    fn test_occlusion_through_active_geometry() {
        let mut engine = SoftwareEngine::default();
        let geo = engine.create_geometry(1, 4).expect("geometry");
        let quad = [
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        engine
            .geometry_add_polygon(geo, 0.9, 0.3, true, &quad)
            .expect("polygon");
        engine
            .geometry_set_position(geo, Vec3::new(0.0, 0.0, 5.0))
            .expect("position");

        let listener = Vec3::new(0.2, 0.4, 0.0);
        let source = Vec3::new(0.2, 0.4, 10.0);
        let occ = engine.geometry_occlusion(listener, source).expect("query");
        assert!((occ.direct - 0.9).abs() < 1e-5);
        assert!((occ.reverb - 0.3).abs() < 1e-5);

        engine.geometry_set_active(geo, false).expect("deactivate");
        let occ = engine.geometry_occlusion(listener, source).expect("query");
        assert!(occ.direct.abs() < 1e-6);
    }

    #[test]
    fn test_settings_3d_validation() {
        let mut engine = SoftwareEngine::default();
        let bad = Settings3D {
            distance_factor: 0.0,
            ..Settings3D::default()
        };
        assert_eq!(engine.set_3d_settings(bad), Err(EngineCode::InvalidParam));
        assert_eq!(engine.settings_3d(), Ok(Settings3D::default()));
    }

    #[test]
    fn test_release_sound_stops_its_channels() {
        let (mut engine, sound) = engine_with(1000, SoftwareConfig::default());
        let ch = engine.play_sound(sound, None, false).expect("slot");
        engine.release_sound(sound).expect("release");
        assert!(engine.channel_is_playing(ch).is_err());
        assert_eq!(engine.play_sound(sound, None, false), Err(EngineCode::InvalidHandle));
    }
}
