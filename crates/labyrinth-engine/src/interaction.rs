//! Things the listener can interact with.

use std::fmt::Debug;
use std::sync::Arc;

use glam::Vec3;
use tracing::info;

use labyrinth_audio::{AcousticGeometry, AudioSystem, GeometryShape, OcclusionMaterial};
use labyrinth_common::{AudioResult, Transform};

/// How far away an interactable can be reached from.
pub const INTERACT_REACH: f32 = 3.0;

/// Result of a successful interaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interaction {
    /// Scene sound to play in response.
    pub cue: Option<String>,
    /// Whether the object is gone afterwards.
    pub remove: bool,
}

/// An object in the scene the listener can use.
pub trait Interactable: Debug {
    /// Scene-unique name.
    fn name(&self) -> &str;

    /// World position used for reach checks.
    fn position(&self) -> Vec3;

    /// Use the object.
    fn interact(&mut self) -> AudioResult<Interaction>;

    /// Per-tick sync with the audio engine.
    fn fixed_update(&mut self) -> AudioResult<()> {
        Ok(())
    }
}

/// A door slab that blocks sound until it is opened.
///
/// Opening plays the door's cue and removes the door, releasing its occluder.
#[derive(Debug)]
pub struct Door {
    name: String,
    transform: Transform,
    occluder: AcousticGeometry,
    cue: Option<String>,
}

impl Door {
    /// Register the slab as a box occluder at `transform`.
    pub fn new(
        system: Arc<AudioSystem>,
        name: &str,
        transform: Transform,
        size: Vec3,
        material: OcclusionMaterial,
        cue: Option<String>,
    ) -> AudioResult<Self> {
        let shape = GeometryShape::Box {
            center: Vec3::ZERO,
            size,
        };
        let occluder = AcousticGeometry::new(system, shape, material, &transform)?;
        Ok(Self {
            name: name.to_string(),
            transform,
            occluder,
            cue,
        })
    }

    /// The slab's occluder.
    #[must_use]
    pub fn occluder(&self) -> &AcousticGeometry {
        &self.occluder
    }
}

impl Interactable for Door {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Vec3 {
        self.transform.position
    }

    fn interact(&mut self) -> AudioResult<Interaction> {
        info!("Door '{}' opened", self.name);
        self.occluder.set_active(false)?;
        Ok(Interaction {
            cue: self.cue.clone(),
            remove: true,
        })
    }

    fn fixed_update(&mut self) -> AudioResult<()> {
        self.occluder.fixed_update(&self.transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labyrinth_audio::AudioConfig;

    fn system() -> Arc<AudioSystem> {
        Arc::new(AudioSystem::software(AudioConfig::default()).expect("software engine"))
    }

    fn door(system: &Arc<AudioSystem>) -> Door {
        Door::new(
            Arc::clone(system),
            "front",
            Transform::from_position(Vec3::new(0.0, 0.0, 5.0)),
            Vec3::new(2.0, 3.0, 0.2),
            OcclusionMaterial::default(),
            Some("creak".to_string()),
        )
        .expect("door")
    }

    #[test]
    fn test_closed_door_occludes() {
        let system = system();
        let door = door(&system);
        let occlusion = system
            .occlusion(Vec3::new(0.1, 0.2, 0.0), Vec3::new(0.1, 0.2, 10.0))
            .expect("occlusion");
        assert!((occlusion.direct - 1.0).abs() < 1e-5);
        assert!(door.occluder().is_active().expect("active"));
    }

    #[test]
    fn test_opening_clears_the_path() {
        let system = system();
        let mut door = door(&system);
        assert_eq!(door.name(), "front");
        assert_eq!(door.position(), Vec3::new(0.0, 0.0, 5.0));
        door.fixed_update().expect("sync");

        let outcome = door.interact().expect("open");
        assert_eq!(outcome.cue.as_deref(), Some("creak"));
        assert!(outcome.remove);

        let occlusion = system
            .occlusion(Vec3::new(0.1, 0.2, 0.0), Vec3::new(0.1, 0.2, 10.0))
            .expect("occlusion");
        assert_eq!(occlusion.direct, 0.0);
    }
}
