//! Low-level audio engine interface.
//!
//! [`AudioBackend`] is the narrow, handle-based API the rest of the crate
//! consumes: sounds, channels, channel groups, DSP units, occlusion geometry
//! and reverb regions. Every call returns an [`EngineResult`]; the facade in
//! [`crate::system`] is the only caller and funnels each result through a
//! single check point.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  ┌──────────────┐  ┌────────────────┐  ┌────────────┐
//! │ Sound3D  │  │ SoundGroup3D │  │AcousticGeometry│  │ ReverbZone │
//! └────┬─────┘  └──────┬───────┘  └───────┬────────┘  └─────┬──────┘
//!      └───────────────┴─────────┬────────┴─────────────────┘
//!                                ▼
//!                     ┌─────────────────────┐
//!                     │ AudioSystem (check) │
//!                     └──────────┬──────────┘
//!                                ▼
//!                     ┌─────────────────────┐
//!                     │  dyn AudioBackend   │
//!                     └─────────────────────┘
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use labyrinth_common::{
    ChannelGroupId, ChannelId, DspId, EngineResult, GeometryId, ReverbId, SoundId,
};

use crate::dsp::DspType;
use crate::presets::ReverbProperties;

/// Loop count meaning "loop forever".
pub const LOOP_FOREVER: i32 = -1;

/// Loop count meaning "play once".
pub const LOOP_ONCE: i32 = 0;

/// Number of reverb instances a channel can send to.
pub const REVERB_INSTANCES: usize = 4;

/// How a sound asset is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoundMode {
    /// Positioned in 3D space (distance attenuation, doppler, occlusion).
    pub positional: bool,
    /// Honors channel loop counts.
    pub looping: bool,
}

impl SoundMode {
    /// Positional, loopable sound: the mode every `Sound3D` uses.
    pub const POSITIONAL_LOOP: Self = Self {
        positional: true,
        looping: true,
    };
}

/// Directional cone of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConeSettings {
    /// Inside cone angle in degrees (full volume).
    pub inside_angle: f32,
    /// Outside cone angle in degrees (attenuated to `outside_volume`).
    pub outside_angle: f32,
    /// Volume outside the outer cone (0.0-1.0).
    pub outside_volume: f32,
}

impl Default for ConeSettings {
    fn default() -> Self {
        Self {
            inside_angle: 360.0,
            outside_angle: 360.0,
            outside_volume: 1.0,
        }
    }
}

/// Global 3D settings, set and read as one unit by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings3D {
    /// Doppler pitch-shift multiplier.
    pub doppler_scale: f32,
    /// World units per meter.
    pub distance_factor: f32,
    /// Distance attenuation multiplier.
    pub rolloff_scale: f32,
}

impl Default for Settings3D {
    fn default() -> Self {
        Self {
            doppler_scale: 1.0,
            distance_factor: 1.0,
            rolloff_scale: 1.0,
        }
    }
}

/// Listener position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerAttributes {
    /// World position.
    pub position: Vec3,
    /// Velocity in world units per second.
    pub velocity: Vec3,
    /// Forward basis vector.
    pub forward: Vec3,
    /// Up basis vector.
    pub up: Vec3,
}

impl Default for ListenerAttributes {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
        }
    }
}

/// Direct and reverb occlusion between two points (0.0 = open, 1.0 = blocked).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Occlusion {
    /// Attenuation of the direct path.
    pub direct: f32,
    /// Attenuation of the reverb path.
    pub reverb: f32,
}

/// Handle-based low-level audio engine.
///
/// Implementations own every engine-side object; callers only ever hold the
/// generational ids. Any call on a handle whose object is gone returns
/// [`labyrinth_common::EngineCode::InvalidHandle`].
pub trait AudioBackend: Send {
    // ============================================
    // System
    // ============================================

    /// Engine version number.
    fn version(&self) -> EngineResult<u32>;

    /// Advance mixing by `dt` seconds.
    fn update(&mut self, dt: f32) -> EngineResult<()>;

    /// Replace the global 3D settings.
    fn set_3d_settings(&mut self, settings: Settings3D) -> EngineResult<()>;

    /// Read the global 3D settings.
    fn settings_3d(&self) -> EngineResult<Settings3D>;

    /// Set the listener attributes.
    fn set_listener(&mut self, listener: ListenerAttributes) -> EngineResult<()>;

    /// Read the listener attributes.
    fn listener(&self) -> EngineResult<ListenerAttributes>;

    // ============================================
    // Sounds
    // ============================================

    /// Open a sound asset.
    fn create_sound(&mut self, path: &Path, mode: SoundMode) -> EngineResult<SoundId>;

    /// Length of a sound in milliseconds, if known.
    fn sound_length_ms(&self, sound: SoundId) -> EngineResult<Option<u32>>;

    /// Release a sound. Channels playing it are stopped.
    fn release_sound(&mut self, sound: SoundId) -> EngineResult<()>;

    /// Start a sound on a new channel.
    fn play_sound(
        &mut self,
        sound: SoundId,
        group: Option<ChannelGroupId>,
        paused: bool,
    ) -> EngineResult<ChannelId>;

    // ============================================
    // Channels
    // ============================================

    /// Whether the channel is alive (paused channels count as playing).
    fn channel_is_playing(&self, channel: ChannelId) -> EngineResult<bool>;

    /// Stop the channel and free its slot.
    fn channel_stop(&mut self, channel: ChannelId) -> EngineResult<()>;

    /// Channel's own paused flag.
    fn channel_paused(&self, channel: ChannelId) -> EngineResult<bool>;

    /// Set the channel's paused flag.
    fn channel_set_paused(&mut self, channel: ChannelId, paused: bool) -> EngineResult<()>;

    /// Playback position in milliseconds.
    fn channel_position_ms(&self, channel: ChannelId) -> EngineResult<u32>;

    /// Seek to a position in milliseconds.
    fn channel_set_position_ms(&mut self, channel: ChannelId, position: u32) -> EngineResult<()>;

    /// Remaining loop count ([`LOOP_FOREVER`] = infinite).
    fn channel_loop_count(&self, channel: ChannelId) -> EngineResult<i32>;

    /// Set the loop count.
    fn channel_set_loop_count(&mut self, channel: ChannelId, count: i32) -> EngineResult<()>;

    /// Linear volume.
    fn channel_volume(&self, channel: ChannelId) -> EngineResult<f32>;

    /// Set linear volume.
    fn channel_set_volume(&mut self, channel: ChannelId, volume: f32) -> EngineResult<()>;

    /// Pitch multiplier.
    fn channel_pitch(&self, channel: ChannelId) -> EngineResult<f32>;

    /// Set the pitch multiplier.
    fn channel_set_pitch(&mut self, channel: ChannelId, pitch: f32) -> EngineResult<()>;

    /// Playback frequency in Hz.
    fn channel_frequency(&self, channel: ChannelId) -> EngineResult<f32>;

    /// Set the playback frequency in Hz.
    fn channel_set_frequency(&mut self, channel: ChannelId, frequency: f32) -> EngineResult<()>;

    /// Mute flag.
    fn channel_mute(&self, channel: ChannelId) -> EngineResult<bool>;

    /// Set the mute flag.
    fn channel_set_mute(&mut self, channel: ChannelId, mute: bool) -> EngineResult<()>;

    /// 3D position and velocity.
    fn channel_3d_attributes(&self, channel: ChannelId) -> EngineResult<(Vec3, Vec3)>;

    /// Set 3D position and velocity.
    fn channel_set_3d_attributes(
        &mut self,
        channel: ChannelId,
        position: Vec3,
        velocity: Vec3,
    ) -> EngineResult<()>;

    /// Cone orientation.
    fn channel_3d_cone_orientation(&self, channel: ChannelId) -> EngineResult<Vec3>;

    /// Set the cone orientation.
    fn channel_set_3d_cone_orientation(
        &mut self,
        channel: ChannelId,
        orientation: Vec3,
    ) -> EngineResult<()>;

    /// Cone angles and outside volume.
    fn channel_3d_cone_settings(&self, channel: ChannelId) -> EngineResult<ConeSettings>;

    /// Set cone angles and outside volume.
    fn channel_set_3d_cone_settings(
        &mut self,
        channel: ChannelId,
        cone: ConeSettings,
    ) -> EngineResult<()>;

    /// Minimum and maximum attenuation distance.
    fn channel_3d_min_max_distance(&self, channel: ChannelId) -> EngineResult<(f32, f32)>;

    /// Set minimum and maximum attenuation distance.
    fn channel_set_3d_min_max_distance(
        &mut self,
        channel: ChannelId,
        min: f32,
        max: f32,
    ) -> EngineResult<()>;

    /// Send level to a reverb instance.
    fn channel_reverb_wet(&self, channel: ChannelId, instance: usize) -> EngineResult<f32>;

    /// Set the send level to a reverb instance.
    fn channel_set_reverb_wet(
        &mut self,
        channel: ChannelId,
        instance: usize,
        wet: f32,
    ) -> EngineResult<()>;

    /// Insert a DSP into the channel chain at `index`.
    fn channel_add_dsp(&mut self, channel: ChannelId, index: usize, dsp: DspId)
        -> EngineResult<()>;

    /// DSP at `index` in the channel chain.
    fn channel_dsp(&self, channel: ChannelId, index: usize) -> EngineResult<DspId>;

    /// Number of DSPs in the channel chain.
    fn channel_num_dsps(&self, channel: ChannelId) -> EngineResult<usize>;

    /// Move the channel into a group (`None` = master).
    fn channel_set_group(
        &mut self,
        channel: ChannelId,
        group: Option<ChannelGroupId>,
    ) -> EngineResult<()>;

    /// Group the channel belongs to (`None` = master).
    fn channel_group(&self, channel: ChannelId) -> EngineResult<Option<ChannelGroupId>>;

    // ============================================
    // Channel groups
    // ============================================

    /// Create a named channel group.
    fn create_channel_group(&mut self, name: &str) -> EngineResult<ChannelGroupId>;

    /// Release a group; its channels fall back to master.
    fn release_channel_group(&mut self, group: ChannelGroupId) -> EngineResult<()>;

    /// Stop every channel in the group.
    fn group_stop(&mut self, group: ChannelGroupId) -> EngineResult<()>;

    /// Group paused flag.
    fn group_paused(&self, group: ChannelGroupId) -> EngineResult<bool>;

    /// Set the group paused flag.
    fn group_set_paused(&mut self, group: ChannelGroupId, paused: bool) -> EngineResult<()>;

    /// Whether any channel in the group is alive.
    fn group_is_playing(&self, group: ChannelGroupId) -> EngineResult<bool>;

    /// Group volume.
    fn group_volume(&self, group: ChannelGroupId) -> EngineResult<f32>;

    /// Set group volume.
    fn group_set_volume(&mut self, group: ChannelGroupId, volume: f32) -> EngineResult<()>;

    /// Group mute flag.
    fn group_mute(&self, group: ChannelGroupId) -> EngineResult<bool>;

    /// Set the group mute flag.
    fn group_set_mute(&mut self, group: ChannelGroupId, mute: bool) -> EngineResult<()>;

    /// Group pitch multiplier.
    fn group_pitch(&self, group: ChannelGroupId) -> EngineResult<f32>;

    /// Set the group pitch multiplier.
    fn group_set_pitch(&mut self, group: ChannelGroupId, pitch: f32) -> EngineResult<()>;

    // ============================================
    // DSP
    // ============================================

    /// Create a DSP unit.
    fn create_dsp(&mut self, kind: DspType) -> EngineResult<DspId>;

    /// Release a DSP unit, detaching it from every chain.
    fn release_dsp(&mut self, dsp: DspId) -> EngineResult<()>;

    /// Type of a DSP unit.
    fn dsp_type(&self, dsp: DspId) -> EngineResult<DspType>;

    /// Read a float parameter.
    fn dsp_parameter(&self, dsp: DspId, index: usize) -> EngineResult<f32>;

    /// Write a float parameter.
    fn dsp_set_parameter(&mut self, dsp: DspId, index: usize, value: f32) -> EngineResult<()>;

    // ============================================
    // Geometry
    // ============================================

    /// Allocate a geometry object with fixed capacity.
    fn create_geometry(&mut self, max_polygons: usize, max_vertices: usize)
        -> EngineResult<GeometryId>;

    /// Add a polygon; returns its index.
    fn geometry_add_polygon(
        &mut self,
        geometry: GeometryId,
        direct_occlusion: f32,
        reverb_occlusion: f32,
        double_sided: bool,
        vertices: &[Vec3],
    ) -> EngineResult<usize>;

    /// Number of polygons added so far.
    fn geometry_num_polygons(&self, geometry: GeometryId) -> EngineResult<usize>;

    /// Declared `(max_polygons, max_vertices)`.
    fn geometry_max_polygons(&self, geometry: GeometryId) -> EngineResult<(usize, usize)>;

    /// World position.
    fn geometry_position(&self, geometry: GeometryId) -> EngineResult<Vec3>;

    /// Set the world position.
    fn geometry_set_position(&mut self, geometry: GeometryId, position: Vec3) -> EngineResult<()>;

    /// Orientation as `(forward, up)`.
    fn geometry_rotation(&self, geometry: GeometryId) -> EngineResult<(Vec3, Vec3)>;

    /// Set the orientation.
    fn geometry_set_rotation(
        &mut self,
        geometry: GeometryId,
        forward: Vec3,
        up: Vec3,
    ) -> EngineResult<()>;

    /// Scale.
    fn geometry_scale(&self, geometry: GeometryId) -> EngineResult<Vec3>;

    /// Set the scale.
    fn geometry_set_scale(&mut self, geometry: GeometryId, scale: Vec3) -> EngineResult<()>;

    /// Active flag.
    fn geometry_active(&self, geometry: GeometryId) -> EngineResult<bool>;

    /// Set the active flag.
    fn geometry_set_active(&mut self, geometry: GeometryId, active: bool) -> EngineResult<()>;

    /// Release a geometry object.
    fn release_geometry(&mut self, geometry: GeometryId) -> EngineResult<()>;

    /// Occlusion between a listener and a source through all active geometry.
    fn geometry_occlusion(&self, listener: Vec3, source: Vec3) -> EngineResult<Occlusion>;

    // ============================================
    // Reverb
    // ============================================

    /// Create a 3D reverb region.
    fn create_reverb(&mut self) -> EngineResult<ReverbId>;

    /// Reverb properties.
    fn reverb_properties(&self, reverb: ReverbId) -> EngineResult<ReverbProperties>;

    /// Replace reverb properties.
    fn reverb_set_properties(
        &mut self,
        reverb: ReverbId,
        properties: &ReverbProperties,
    ) -> EngineResult<()>;

    /// Position and falloff radii as `(position, min, max)`.
    fn reverb_3d_attributes(&self, reverb: ReverbId) -> EngineResult<(Vec3, f32, f32)>;

    /// Set position and falloff radii.
    fn reverb_set_3d_attributes(
        &mut self,
        reverb: ReverbId,
        position: Vec3,
        min_distance: f32,
        max_distance: f32,
    ) -> EngineResult<()>;

    /// Active flag.
    fn reverb_active(&self, reverb: ReverbId) -> EngineResult<bool>;

    /// Set the active flag.
    fn reverb_set_active(&mut self, reverb: ReverbId, active: bool) -> EngineResult<()>;

    /// Release a reverb region.
    fn release_reverb(&mut self, reverb: ReverbId) -> EngineResult<()>;
}
