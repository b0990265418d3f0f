//! Occlusion geometry mirrored from scene shapes.
//!
//! A planar quad or a box collider is converted into faces, registered with
//! an engine geometry object sized exactly to the shape, and kept in sync
//! with the owner's transform every tick.

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use labyrinth_common::{AudioError, AudioResult, EngineCode, GeometryId, Transform};

use crate::system::AudioSystem;

/// Occlusion coefficients shared by every face of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionMaterial {
    /// Direct path attenuation (0.0 = none, 1.0 = full).
    pub direct: f32,
    /// Reverb path attenuation.
    pub reverb: f32,
    /// Whether faces block sound from both sides.
    pub double_sided: bool,
}

impl Default for OcclusionMaterial {
    fn default() -> Self {
        Self {
            direct: 1.0,
            reverb: 1.0,
            double_sided: true,
        }
    }
}

/// Source shape of an occluder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometryShape {
    /// Planar quad from mesh-local vertices.
    Quad {
        /// The four mesh vertices.
        vertices: [Vec3; 4],
    },
    /// Box collider in object space.
    Box {
        /// Collider center.
        center: Vec3,
        /// Collider extents along each axis.
        size: Vec3,
    },
}

/// Quad triangles as vertex indices.
const QUAD_FACES: [[usize; 3]; 2] = [[0, 2, 1], [1, 3, 0]];

/// Box faces as corner indices.
const BOX_FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 0, 3, 7],
    [5, 4, 7, 6],
    [1, 5, 6, 2],
    [3, 2, 6, 7],
    [1, 0, 4, 5],
];

impl GeometryShape {
    /// The unit quad mesh: 1×1 in the XY plane, facing +Z.
    #[must_use]
    pub const fn unit_quad() -> Self {
        Self::Quad {
            vertices: [
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
        }
    }

    /// Exact `(polygons, vertices)` capacity the shape needs.
    #[must_use]
    pub const fn capacity(&self) -> (usize, usize) {
        match self {
            Self::Quad { .. } => (QUAD_FACES.len(), QUAD_FACES.len() * 3),
            Self::Box { .. } => (BOX_FACES.len(), BOX_FACES.len() * 4),
        }
    }

    /// Box corners; each axis offset by half the size in that axis.
    fn box_corners(center: Vec3, size: Vec3) -> [Vec3; 8] {
        let h = size / 2.0;
        [
            center + Vec3::new(h.x, -h.y, h.z),
            center + Vec3::new(-h.x, -h.y, h.z),
            center + Vec3::new(-h.x, h.y, h.z),
            center + Vec3::new(h.x, h.y, h.z),
            center + Vec3::new(h.x, -h.y, -h.z),
            center + Vec3::new(-h.x, -h.y, -h.z),
            center + Vec3::new(-h.x, h.y, -h.z),
            center + Vec3::new(h.x, h.y, -h.z),
        ]
    }

    /// Faces in the geometry's local space.
    ///
    /// Quad vertices are mesh-local and get `lossy_scale` baked in; box
    /// corners stay unscaled because the engine applies the scale.
    #[must_use]
    pub fn faces(&self, lossy_scale: Vec3) -> Vec<Vec<Vec3>> {
        match *self {
            Self::Quad { vertices } => {
                let scaled = vertices.map(|v| v * lossy_scale);
                QUAD_FACES
                    .iter()
                    .map(|face| face.iter().map(|&i| scaled[i]).collect())
                    .collect()
            },
            Self::Box { center, size } => {
                let corners = Self::box_corners(center, size);
                BOX_FACES
                    .iter()
                    .map(|face| face.iter().map(|&i| corners[i]).collect())
                    .collect()
            },
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fills a fixed-capacity geometry object, rejecting any face count that does
/// not match the declaration. Dropping an unfinished builder releases the
/// geometry.
#[derive(Debug)]
pub struct GeometryBuilder {
    system: Arc<AudioSystem>,
    id: Option<GeometryId>,
    declared_polygons: usize,
    declared_vertices: usize,
    polygons: usize,
    vertices: usize,
}

impl GeometryBuilder {
    /// Allocate geometry with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot allocate the geometry.
    pub fn new(system: Arc<AudioSystem>, max_polygons: usize, max_vertices: usize) -> AudioResult<Self> {
        let id = system.create_geometry(max_polygons, max_vertices)?;
        Ok(Self {
            system,
            id: Some(id),
            declared_polygons: max_polygons,
            declared_vertices: max_vertices,
            polygons: 0,
            vertices: 0,
        })
    }

    fn mismatch(&self, polygons: usize, vertices: usize) -> AudioError {
        AudioError::CapacityMismatch {
            declared_polygons: self.declared_polygons,
            declared_vertices: self.declared_vertices,
            polygons,
            vertices,
        }
    }

    /// Add one face with `material`.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::CapacityMismatch`] if the face does not fit.
    pub fn add_face(&mut self, material: &OcclusionMaterial, face: &[Vec3]) -> AudioResult<usize> {
        let polygons = self.polygons + 1;
        let vertices = self.vertices + face.len();
        if polygons > self.declared_polygons || vertices > self.declared_vertices {
            return Err(self.mismatch(polygons, vertices));
        }
        let id = self.id.ok_or(AudioError::EngineCall(EngineCode::NotReady))?;
        let index = self.system.geometry(id).add_polygon(
            material.direct,
            material.reverb,
            material.double_sided,
            face,
        )?;
        self.polygons = polygons;
        self.vertices = vertices;
        Ok(index)
    }

    /// Hand over the geometry once it is exactly full.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::CapacityMismatch`] if fewer faces were added
    /// than declared; the geometry is released.
    pub fn finish(mut self) -> AudioResult<GeometryId> {
        if self.polygons != self.declared_polygons || self.vertices != self.declared_vertices {
            return Err(self.mismatch(self.polygons, self.vertices));
        }
        self.id.take().ok_or(AudioError::EngineCall(EngineCode::NotReady))
    }
}

impl Drop for GeometryBuilder {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            let _ = self.system.release_geometry(id);
        }
    }
}

// ============================================================================
// AcousticGeometry
// ============================================================================

/// A registered occluder that follows its owner's transform.
#[derive(Debug)]
pub struct AcousticGeometry {
    system: Arc<AudioSystem>,
    id: GeometryId,
    shape: GeometryShape,
    material: OcclusionMaterial,
}

impl AcousticGeometry {
    /// Register `shape` and place it at `transform`.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation or any face registration fails.
    pub fn new(
        system: Arc<AudioSystem>,
        shape: GeometryShape,
        material: OcclusionMaterial,
        transform: &Transform,
    ) -> AudioResult<Self> {
        let (max_polygons, max_vertices) = shape.capacity();
        let mut builder = GeometryBuilder::new(Arc::clone(&system), max_polygons, max_vertices)?;
        for face in shape.faces(transform.lossy_scale) {
            builder.add_face(&material, &face)?;
        }
        let id = builder.finish()?;
        debug!("Registered {shape:?} as {id}");

        let geometry = Self {
            system,
            id,
            shape,
            material,
        };
        if matches!(shape, GeometryShape::Quad { .. }) {
            geometry
                .system
                .geometry(id)
                .set_rotation(transform.forward, transform.up)?;
        }
        geometry.fixed_update(transform)?;
        Ok(geometry)
    }

    /// Engine geometry handle.
    #[must_use]
    pub const fn id(&self) -> GeometryId {
        self.id
    }

    /// Source shape.
    #[must_use]
    pub const fn shape(&self) -> &GeometryShape {
        &self.shape
    }

    /// Face material.
    #[must_use]
    pub const fn material(&self) -> &OcclusionMaterial {
        &self.material
    }

    /// Push the transform: position for quads; position, rotation and scale
    /// for boxes.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the transform.
    pub fn fixed_update(&self, transform: &Transform) -> AudioResult<()> {
        let ctl = self.system.geometry(self.id);
        ctl.set_position(transform.position)?;
        if let GeometryShape::Box { .. } = self.shape {
            ctl.set_rotation(transform.forward, transform.up)?;
            ctl.set_scale(transform.lossy_scale)?;
        }
        Ok(())
    }

    /// Enable or disable occlusion without releasing the geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn set_active(&self, active: bool) -> AudioResult<()> {
        self.system.geometry(self.id).set_active(active)
    }

    /// Whether the geometry currently occludes.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn is_active(&self) -> AudioResult<bool> {
        self.system.geometry(self.id).is_active()
    }
}

impl Drop for AcousticGeometry {
    fn drop(&mut self) {
        let _ = self.set_active(false);
        let _ = self.system.release_geometry(self.id);
    }
}
