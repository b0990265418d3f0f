//! Mixer groups of positional sounds.

use std::sync::Arc;

use tracing::debug;

use labyrinth_common::{AudioResult, ChannelGroupId};

use crate::sound::Sound3D;
use crate::system::AudioSystem;

/// Several [`Sound3D`]s driven as one through an engine channel group.
///
/// Members remember the group, so replacement channels rejoin it.
#[derive(Debug)]
pub struct SoundGroup3D {
    system: Arc<AudioSystem>,
    id: ChannelGroupId,
    name: String,
}

impl SoundGroup3D {
    /// Create an empty named group.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot create the group.
    pub fn new(system: Arc<AudioSystem>, name: &str) -> AudioResult<Self> {
        let id = system.create_channel_group(name)?;
        Ok(Self {
            system,
            id,
            name: name.to_string(),
        })
    }

    /// Create a group and assign `members` to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the group cannot be created or a member cannot join.
    pub fn with_members<'a>(
        system: Arc<AudioSystem>,
        name: &str,
        members: impl IntoIterator<Item = &'a mut Sound3D>,
    ) -> AudioResult<Self> {
        let group = Self::new(system, name)?;
        for member in members {
            group.add(member)?;
        }
        Ok(group)
    }

    /// Assign a sound to this group.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the assignment.
    pub fn add(&self, sound: &mut Sound3D) -> AudioResult<()> {
        debug!("'{}' joins group '{}'", sound.name(), self.name);
        sound.set_channel_group(Some(self.id))
    }

    /// Engine group handle.
    #[must_use]
    pub const fn id(&self) -> ChannelGroupId {
        self.id
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop every member channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn stop(&self) -> AudioResult<()> {
        self.system.group(self.id).stop()
    }

    /// Pause the whole group.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn pause(&self) -> AudioResult<()> {
        self.system.group(self.id).set_paused(true)
    }

    /// Unpause the whole group.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn resume(&self) -> AudioResult<()> {
        self.system.group(self.id).set_paused(false)
    }

    /// Group paused flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn is_paused(&self) -> AudioResult<bool> {
        self.system.group(self.id).is_paused()
    }

    /// Whether any member channel is alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn is_playing(&self) -> AudioResult<bool> {
        self.system.group(self.id).is_playing()
    }

    /// Group volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn volume(&self) -> AudioResult<f32> {
        self.system.group(self.id).volume()
    }

    /// Set group volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn set_volume(&self, volume: f32) -> AudioResult<()> {
        self.system.group(self.id).set_volume(volume)
    }

    /// Mute or unmute the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn set_mute(&self, mute: bool) -> AudioResult<()> {
        self.system.group(self.id).set_mute(mute)
    }

    /// Set the group pitch multiplier.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn set_pitch(&self, pitch: f32) -> AudioResult<()> {
        self.system.group(self.id).set_pitch(pitch)
    }
}

impl Drop for SoundGroup3D {
    fn drop(&mut self) {
        let _ = self.system.release_channel_group(self.id);
    }
}
