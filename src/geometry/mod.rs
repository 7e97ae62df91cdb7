//! # Procedural Geometry
//!
//! Meshes used by the editor are generated procedurally: a unit cube for
//! boxes and wardrobe boards, and a unit UV sphere. Objects scale these
//! through their model matrix, so every box shares the same vertex layout.
//!
//! ## Usage
//!
//! ```rust
//! use wardrobe_designer::geometry::{unit_cube, unit_sphere};
//!
//! let cube = unit_cube();
//! assert_eq!(cube.index_count(), 36);
//!
//! let sphere = unit_sphere(32, 16);
//! assert!(sphere.vertices.len() > 0);
//! ```

pub mod bounds;
pub mod primitives;
pub mod vertex;

pub use bounds::Bounds;
pub use primitives::{unit_cube, unit_sphere};
pub use vertex::Vertex3D;

/// CPU-side mesh ready for upload to a render backend.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3D>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Object-space bounds of the vertex positions.
    pub fn local_bounds(&self) -> Bounds {
        Bounds::from_points(self.vertices.iter().map(|v| v.position.into()))
    }
}
