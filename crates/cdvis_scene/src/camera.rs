//! Cameras attached to scene nodes
//!
//! View and projection are cached and rebuilt only when the camera node's
//! world transform has been recomputed or a camera parameter changed.

use cdvis_core::HandleError;
use cdvis_math::{frustum_lh, orthographic_lh, perspective_lh, radians, Mat4, Quat, Vec3, Vec4};

use crate::graph::{NodeId, SceneGraph};

/// How the camera projects
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Symmetric perspective from a vertical field of view in radians
    Perspective { fov_y: f32 },
    /// Off-axis perspective from tangent bounds (left, right, bottom, top),
    /// as reported per eye by a headset
    Bounds(Vec4),
    /// Orthographic with the given vertical half-size
    Orthographic { size: f32 },
}

/// Everything a draw needs from the camera this frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub inverse_projection: Mat4,
    pub world_position: Vec3,
}

#[derive(Debug, Clone)]
pub struct Camera {
    node: NodeId,
    projection: Projection,
    near: f32,
    far: f32,
    pixel_width: u32,
    pixel_height: u32,
    cached: Option<CameraMatrices>,
    seen_revision: u64,
}

impl Camera {
    pub const DEFAULT_FOV_DEGREES: f32 = 70.0;
    pub const DEFAULT_NEAR: f32 = 0.01;
    pub const DEFAULT_FAR: f32 = 50.0;

    pub fn new(node: NodeId, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            node,
            projection: Projection::Perspective {
                fov_y: radians(Self::DEFAULT_FOV_DEGREES),
            },
            near: Self::DEFAULT_NEAR,
            far: Self::DEFAULT_FAR,
            pixel_width: pixel_width.max(1),
            pixel_height: pixel_height.max(1),
            cached: None,
            seen_revision: 0,
        }
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.cached = None;
    }

    pub fn set_field_of_view(&mut self, fov_y: f32) {
        self.set_projection(Projection::Perspective { fov_y });
    }

    pub fn set_perspective_bounds(&mut self, bounds: Vec4) {
        self.set_projection(Projection::Bounds(bounds));
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.cached = None;
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) != (self.pixel_width, self.pixel_height) {
            self.pixel_width = width;
            self.pixel_height = height;
            self.cached = None;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.pixel_width as f32 / self.pixel_height as f32
    }

    /// Orient the camera node toward a world-space point
    pub fn look_at(&self, graph: &mut SceneGraph, target: Vec3) -> Result<(), HandleError> {
        let eye = graph.world_position(self.node)?;
        let forward = (target - eye).normalize_or_zero();
        if forward == Vec3::ZERO {
            return Ok(());
        }
        let parent_rotation = match graph.parent(self.node)? {
            Some(p) => graph.world_rotation(p)?,
            None => Quat::IDENTITY,
        };
        // yaw then pitch keeps the horizon level
        let yaw = forward.x.atan2(forward.z);
        let pitch = -forward.y.clamp(-1.0, 1.0).asin();
        let rotation = Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch);
        graph.set_local_rotation(self.node, parent_rotation.inverse() * rotation)
    }

    /// Current matrices, rebuilt if the node moved or parameters changed
    pub fn matrices(&mut self, graph: &mut SceneGraph) -> Result<CameraMatrices, HandleError> {
        let revision = graph.revision(self.node)?;
        if let Some(cached) = self.cached {
            if revision == self.seen_revision {
                return Ok(cached);
            }
        }

        let world = graph.world(self.node)?;
        let up = world.rotation * Vec3::Y;
        let forward = world.rotation * Vec3::Z;
        let view = Mat4::look_at_lh(world.position, world.position + forward, up);
        let projection = self.build_projection();

        let matrices = CameraMatrices {
            view,
            projection,
            view_projection: projection * view,
            inverse_projection: projection.inverse(),
            world_position: world.position,
        };
        self.cached = Some(matrices);
        self.seen_revision = revision;
        Ok(matrices)
    }

    fn build_projection(&self) -> Mat4 {
        let aspect = self.aspect();
        match self.projection {
            Projection::Perspective { fov_y } => perspective_lh(fov_y, aspect, self.near, self.far),
            Projection::Bounds(b) => {
                let s = b * self.near;
                frustum_lh(s.x, s.y, s.z, s.w, self.near, self.far)
            }
            Projection::Orthographic { size } => orthographic_lh(
                -size * aspect,
                size * aspect,
                -size,
                size,
                self.near,
                self.far,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_moves_world_into_camera_space() {
        let mut graph = SceneGraph::new();
        let node = graph.create("camera");
        graph.set_local_position(node, Vec3::new(0.0, 0.0, -2.0)).unwrap();
        let mut camera = Camera::new(node, 1600, 900);

        let m = camera.matrices(&mut graph).unwrap();
        let p = m.view.transform_point3(Vec3::ZERO);
        // origin is two units in front of the camera (+z forward)
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));
        assert!((m.projection * m.inverse_projection).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn test_matrices_cached_until_moved() {
        let mut graph = SceneGraph::new();
        let node = graph.create("camera");
        let mut camera = Camera::new(node, 800, 600);

        let a = camera.matrices(&mut graph).unwrap();
        let b = camera.matrices(&mut graph).unwrap();
        assert_eq!(a, b);

        graph.set_local_position(node, Vec3::X).unwrap();
        let c = camera.matrices(&mut graph).unwrap();
        assert_ne!(a.view, c.view);
        assert!(c.world_position.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_resize_rebuilds_projection() {
        let mut graph = SceneGraph::new();
        let node = graph.create("camera");
        let mut camera = Camera::new(node, 800, 800);
        let a = camera.matrices(&mut graph).unwrap();
        camera.resize(1600, 800);
        let b = camera.matrices(&mut graph).unwrap();
        assert!((a.projection.x_axis.x - 2.0 * b.projection.x_axis.x).abs() < 1e-5);
    }

    #[test]
    fn test_look_at_faces_target() {
        let mut graph = SceneGraph::new();
        let node = graph.create("camera");
        graph.set_local_position(node, Vec3::new(0.0, 1.0, -1.0)).unwrap();
        let mut camera = Camera::new(node, 100, 100);
        camera.look_at(&mut graph, Vec3::ZERO).unwrap();

        let forward = graph.world_rotation(node).unwrap() * Vec3::Z;
        let expected = Vec3::new(0.0, -1.0, 1.0).normalize();
        assert!(forward.abs_diff_eq(expected, 1e-4));
        let m = camera.matrices(&mut graph).unwrap();
        let p = m.view.transform_point3(Vec3::ZERO);
        assert!(p.x.abs() < 1e-4 && p.y.abs() < 1e-4 && p.z > 0.0);
    }
}
