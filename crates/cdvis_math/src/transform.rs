//! TRS transforms and parent-child composition

use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale of a node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    #[inline]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    #[inline]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// translate * rotate * scale
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Resolved world-space state of a node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub object_to_world: Mat4,
    pub world_to_object: Mat4,
}

impl WorldTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        object_to_world: Mat4::IDENTITY,
        world_to_object: Mat4::IDENTITY,
    };

    /// World state of a root node
    pub fn from_local(local: &Transform) -> Self {
        let object_to_world = local.to_matrix();
        Self {
            position: local.position,
            rotation: local.rotation,
            scale: local.scale,
            object_to_world,
            world_to_object: object_to_world.inverse(),
        }
    }

    /// World state of a node under `parent`.
    ///
    /// Matrices compose exactly; position goes through the parent matrix,
    /// rotations multiply and scales multiply componentwise.
    pub fn compose(parent: &WorldTransform, local: &Transform) -> Self {
        let object_to_world = parent.object_to_world * local.to_matrix();
        Self {
            position: parent.object_to_world.transform_point3(local.position),
            rotation: parent.rotation * local.rotation,
            scale: parent.scale * local.scale,
            object_to_world,
            world_to_object: object_to_world.inverse(),
        }
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
