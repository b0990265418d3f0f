//! Spherical reverb regions.

use std::sync::Arc;

use glam::Vec3;
use tracing::debug;

use labyrinth_common::{AudioError, AudioResult, ReverbId};

use crate::presets::{ReverbPreset, ReverbProperties};
use crate::system::AudioSystem;

fn validate_radii(min: f32, max: f32) -> AudioResult<()> {
    if min.is_finite() && max.is_finite() && (0.0..=max).contains(&min) {
        Ok(())
    } else {
        Err(AudioError::InvalidRadii { min, max })
    }
}

/// A reverb preset applied inside a sphere.
///
/// Full effect within `min_radius`, fading out to nothing at `max_radius`.
#[derive(Debug)]
pub struct ReverbZone {
    system: Arc<AudioSystem>,
    id: ReverbId,
    preset: ReverbPreset,
    min_radius: f32,
    max_radius: f32,
}

impl ReverbZone {
    /// Create the region, apply `preset` and place it.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::InvalidRadii`] if `min_radius` is negative or
    /// larger than `max_radius`, or an engine error.
    pub fn new(
        system: Arc<AudioSystem>,
        preset: ReverbPreset,
        min_radius: f32,
        max_radius: f32,
        position: Vec3,
    ) -> AudioResult<Self> {
        validate_radii(min_radius, max_radius)?;
        let id = system.create_reverb()?;
        let zone = Self {
            system,
            id,
            preset,
            min_radius,
            max_radius,
        };
        zone.system
            .reverb(id)
            .set_properties(&preset.properties())?;
        zone.fixed_update(position)?;
        debug!("Reverb zone {id} ({preset:?}) at {position}, radii {min_radius}..{max_radius}");
        Ok(zone)
    }

    /// Engine reverb handle.
    #[must_use]
    pub const fn id(&self) -> ReverbId {
        self.id
    }

    /// Applied preset.
    #[must_use]
    pub const fn preset(&self) -> ReverbPreset {
        self.preset
    }

    /// `(min_radius, max_radius)`.
    #[must_use]
    pub const fn radii(&self) -> (f32, f32) {
        (self.min_radius, self.max_radius)
    }

    /// Re-push position and radii.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the attributes.
    pub fn fixed_update(&self, position: Vec3) -> AudioResult<()> {
        self.system
            .reverb(self.id)
            .set_attributes_3d(position, self.min_radius, self.max_radius)
    }

    /// Resize the sphere; applied on the next [`Self::fixed_update`].
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::InvalidRadii`] and keeps the old radii if the
    /// new ones are inconsistent.
    pub fn set_radii(&mut self, min_radius: f32, max_radius: f32) -> AudioResult<()> {
        validate_radii(min_radius, max_radius)?;
        self.min_radius = min_radius;
        self.max_radius = max_radius;
        Ok(())
    }

    /// Switch to another preset.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    pub fn set_preset(&mut self, preset: ReverbPreset) -> AudioResult<()> {
        self.system
            .reverb(self.id)
            .set_properties(&preset.properties())?;
        self.preset = preset;
        Ok(())
    }

    /// Properties as the engine reports them.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn properties(&self) -> AudioResult<ReverbProperties> {
        self.system.reverb(self.id).properties()
    }

    /// Toggle the region without destroying it.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn set_active(&self, active: bool) -> AudioResult<()> {
        self.system.reverb(self.id).set_active(active)
    }

    /// Whether the region is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn is_active(&self) -> AudioResult<bool> {
        self.system.reverb(self.id).is_active()
    }
}

impl Drop for ReverbZone {
    fn drop(&mut self) {
        let _ = self.set_active(false);
        let _ = self.system.release_reverb(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::AudioConfig;

    fn system() -> Arc<AudioSystem> {
        Arc::new(AudioSystem::software(AudioConfig::default()).expect("software engine"))
    }

    #[test]
    fn test_zone_applies_preset_and_sphere() {
        let system = system();
        let zone = ReverbZone::new(Arc::clone(&system), ReverbPreset::Cave, 2.0, 10.0, Vec3::X)
            .expect("zone");
        assert_eq!(zone.properties().expect("props"), ReverbPreset::Cave.properties());
        let (position, min, max) = system.reverb(zone.id()).attributes_3d().expect("attrs");
        assert_eq!((position, min, max), (Vec3::X, 2.0, 10.0));
    }

    #[test]
    fn test_toggle_keeps_properties() {
        let system = system();
        let zone = ReverbZone::new(Arc::clone(&system), ReverbPreset::Hallway, 1.0, 5.0, Vec3::ZERO)
            .expect("zone");
        let before = zone.properties().expect("props");
        zone.set_active(false).expect("off");
        assert!(!zone.is_active().expect("flag"));
        zone.set_active(true).expect("on");
        assert_eq!(zone.properties().expect("props"), before);
    }

    #[test]
    fn test_inverted_radii_are_rejected() {
        let system = system();
        let err = ReverbZone::new(Arc::clone(&system), ReverbPreset::Room, 8.0, 2.0, Vec3::ZERO)
            .expect_err("min > max");
        assert!(matches!(err, AudioError::InvalidRadii { .. }));

        let mut zone = ReverbZone::new(system, ReverbPreset::Room, 0.0, 2.0, Vec3::ZERO)
            .expect("zone");
        assert!(zone.set_radii(-1.0, 2.0).is_err());
        assert_eq!(zone.radii(), (0.0, 2.0));
        zone.set_radii(3.0, 3.0).expect("equal radii");
        zone.fixed_update(Vec3::Y).expect("push");
    }

    #[test]
    fn test_none_preset_and_switch() {
        let system = system();
        let mut zone = ReverbZone::new(system, ReverbPreset::None, 1.0, 2.0, Vec3::ZERO)
            .expect("zone");
        assert_eq!(zone.properties().expect("props"), ReverbProperties::default());
        zone.set_preset(ReverbPreset::Underwater).expect("switch");
        assert_eq!(zone.preset(), ReverbPreset::Underwater);
        assert_eq!(zone.properties().expect("props").wet_level, 7.0);
    }

    #[test]
    fn test_drop_releases_reverb() {
        let system = system();
        let id = ReverbZone::new(Arc::clone(&system), ReverbPreset::Forest, 1.0, 2.0, Vec3::ZERO)
            .expect("zone")
            .id();
        assert!(system.reverb(id).is_active().is_err());
    }
}
