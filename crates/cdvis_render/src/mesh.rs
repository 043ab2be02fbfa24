//! CPU-side mesh data and the built-in shapes

use bytemuck::{Pod, Zeroable};
use cdvis_math::{Aabb, Vec3};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
}

/// Geometry ready for upload
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
    pub bounds: Aabb,
}

impl MeshData {
    /// Unit cube spanning [-0.5, 0.5] on every axis: 24 vertices with face
    /// normals, 36 indices wound clockwise seen from outside
    pub fn cube() -> Self {
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X),
            (Vec3::Z, Vec3::Y, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, right) in faces {
            let base = vertices.len() as u32;
            let c = normal * 0.5;
            for (u, v) in [(-0.5, -0.5), (-0.5, 0.5), (0.5, 0.5), (0.5, -0.5)] {
                let p = c + right * u + up * v;
                vertices.push(Vertex::new(p.to_array(), normal.to_array()));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            vertices,
            indices,
            topology: Topology::Triangles,
            bounds: Aabb::new(Vec3::ZERO, Vec3::splat(0.5)),
        }
    }

    /// Edges of the unit cube as a line list
    pub fn wire_cube() -> Self {
        let mut vertices = Vec::with_capacity(8);
        for i in 0..8 {
            let p = Vec3::new(
                if i & 1 == 0 { -0.5 } else { 0.5 },
                if i & 2 == 0 { -0.5 } else { 0.5 },
                if i & 4 == 0 { -0.5 } else { 0.5 },
            );
            vertices.push(Vertex::new(p.to_array(), (p * 2.0).normalize().to_array()));
        }
        let mut indices = Vec::with_capacity(24);
        for a in 0u32..8 {
            for bit in [1u32, 2, 4] {
                if a & bit == 0 {
                    indices.extend_from_slice(&[a, a | bit]);
                }
            }
        }

        Self {
            vertices,
            indices,
            topology: Topology::Lines,
            bounds: Aabb::new(Vec3::ZERO, Vec3::splat(0.5)),
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_counts() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
        for v in &cube.vertices {
            assert!(cube.bounds.contains_point(Vec3::from_array(v.position)));
        }
    }

    #[test]
    fn test_cube_winding_matches_normals() {
        let cube = MeshData::cube();
        for tri in cube.indices.chunks(3) {
            let a = Vec3::from_array(cube.vertices[tri[0] as usize].position);
            let b = Vec3::from_array(cube.vertices[tri[1] as usize].position);
            let c = Vec3::from_array(cube.vertices[tri[2] as usize].position);
            let n = Vec3::from_array(cube.vertices[tri[0] as usize].normal);
            // left-handed: clockwise from outside gives (b - a) x (c - a) along the normal
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn test_wire_cube_edges() {
        let wire = MeshData::wire_cube();
        assert_eq!(wire.vertices.len(), 8);
        assert_eq!(wire.index_count(), 24);
        assert_eq!(wire.topology, Topology::Lines);
    }
}
