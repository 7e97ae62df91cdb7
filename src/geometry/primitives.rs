//! # Primitive Shape Generation
//!
//! Unit shapes with outward normals, counter-clockwise winding and UVs.

use super::{MeshData, Vertex3D};
use std::f32::consts::PI;

/// One cube face: outward normal plus the in-plane axes used to place its corners.
struct Face {
    normal: [f32; 3],
    u: [f32; 3],
    v: [f32; 3],
}

const CUBE_FACES: [Face; 6] = [
    // +Z
    Face { normal: [0.0, 0.0, 1.0], u: [1.0, 0.0, 0.0], v: [0.0, 1.0, 0.0] },
    // -Z
    Face { normal: [0.0, 0.0, -1.0], u: [-1.0, 0.0, 0.0], v: [0.0, 1.0, 0.0] },
    // -X
    Face { normal: [-1.0, 0.0, 0.0], u: [0.0, 0.0, 1.0], v: [0.0, 1.0, 0.0] },
    // +X
    Face { normal: [1.0, 0.0, 0.0], u: [0.0, 0.0, -1.0], v: [0.0, 1.0, 0.0] },
    // +Y
    Face { normal: [0.0, 1.0, 0.0], u: [1.0, 0.0, 0.0], v: [0.0, 0.0, -1.0] },
    // -Y
    Face { normal: [0.0, -1.0, 0.0], u: [1.0, 0.0, 0.0], v: [0.0, 0.0, 1.0] },
];

/// Cube spanning -0.5..0.5 on every axis.
///
/// Each face has its own four vertices so normals and UVs stay flat.
pub fn unit_cube() -> MeshData {
    let mut mesh = MeshData::default();

    for face in &CUBE_FACES {
        let base = mesh.vertices.len() as u32;
        for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = [
                0.5 * (face.normal[0] + su * face.u[0] + sv * face.v[0]),
                0.5 * (face.normal[1] + su * face.u[1] + sv * face.v[1]),
                0.5 * (face.normal[2] + su * face.u[2] + sv * face.v[2]),
            ];
            mesh.vertices.push(Vertex3D {
                position,
                normal: face.normal,
                uv: [(su + 1.0) * 0.5, 1.0 - (sv + 1.0) * 0.5],
            });
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    mesh
}

/// UV sphere of radius 1.0 centered at the origin.
///
/// # Arguments
/// * `longitude_segments` - Number of vertical segments, at least 3
/// * `latitude_segments` - Number of horizontal rings, at least 2
pub fn unit_sphere(longitude_segments: u32, latitude_segments: u32) -> MeshData {
    let mut mesh = MeshData::default();

    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let p = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            mesh.vertices.push(Vertex3D {
                position: p,
                normal: p,
                uv: [long as f32 / long_segs as f32, lat as f32 / lat_segs as f32],
            });
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            mesh.indices.extend_from_slice(&[first, first + 1, second]);
            mesh.indices
                .extend_from_slice(&[second, first + 1, second + 1]);
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    fn triangle_normal(mesh: &MeshData, tri: usize) -> Vector3<f32> {
        let p = |i: usize| -> Vector3<f32> {
            mesh.vertices[mesh.indices[tri * 3 + i] as usize].position.into()
        };
        (p(1) - p(0)).cross(p(2) - p(0))
    }

    #[test]
    fn test_cube_generation() {
        let cube = unit_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.triangle_count(), 12);

        let bounds = cube.local_bounds();
        assert_eq!(bounds.min, Vector3::new(-0.5, -0.5, -0.5));
        assert_eq!(bounds.max, Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_cube_winding_faces_outward() {
        let cube = unit_cube();
        for tri in 0..cube.triangle_count() {
            let n: Vector3<f32> = cube.vertices[cube.indices[tri * 3] as usize].normal.into();
            assert!(triangle_normal(&cube, tri).dot(n) > 0.0, "triangle {tri} is inverted");
        }
    }

    #[test]
    fn test_sphere_generation() {
        let sphere = unit_sphere(16, 8);
        assert_eq!(sphere.vertices.len(), 17 * 9);
        assert_eq!(sphere.triangle_count(), 16 * 8 * 2);

        for v in &sphere.vertices {
            let len = Vector3::from(v.position).magnitude();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_winding_faces_outward() {
        let sphere = unit_sphere(12, 6);
        for tri in 0..sphere.triangle_count() {
            let n = triangle_normal(&sphere, tri);
            if n.magnitude2() < 1e-10 {
                continue; // degenerate triangles at the poles
            }
            let centroid: Vector3<f32> = (0..3)
                .map(|i| Vector3::from(sphere.vertices[sphere.indices[tri * 3 + i] as usize].position))
                .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p);
            assert!(n.dot(centroid) > 0.0, "triangle {tri} is inverted");
        }
    }
}
