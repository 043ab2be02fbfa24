//! Bounding volumes for interaction queries

use glam::{Mat4, Quat, Vec3};

/// Axis-aligned box stored as center and half-extents
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Aabb {
    #[inline]
    pub const fn new(center: Vec3, extents: Vec3) -> Self {
        Self { center, extents }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        let s = (point - self.center).abs();
        s.cmple(self.extents).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.cmple(b_max).all() && b_min.cmple(a_max).all()
    }

    /// Carry this box into world space as an oriented box
    pub fn to_world(&self, object_to_world: &Mat4, world_scale: Vec3, world_rotation: Quat) -> Obb {
        Obb::new(
            object_to_world.transform_point3(self.center),
            self.extents * world_scale.abs(),
            world_rotation,
        )
    }
}

/// Oriented bounding box: center, half-extents and orientation
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Obb {
    pub center: Vec3,
    pub extents: Vec3,
    pub orientation: Quat,
}

impl Obb {
    #[inline]
    pub const fn new(center: Vec3, extents: Vec3, orientation: Quat) -> Self {
        Self { center, extents, orientation }
    }

    #[inline]
    pub fn axis_aligned(center: Vec3, extents: Vec3) -> Self {
        Self::new(center, extents, Quat::IDENTITY)
    }

    /// Point relative to the center, in box-local axes
    #[inline]
    fn to_local(&self, point: Vec3) -> Vec3 {
        self.orientation.inverse() * (point - self.center)
    }

    /// Point containment, faces inclusive
    pub fn contains_point(&self, point: Vec3) -> bool {
        let s = self.to_local(point);
        s.abs().cmple(self.extents).all()
    }

    /// Sphere proximity test.
    ///
    /// Squared distance is accumulated per local axis for every axis the
    /// point lies outside of, then compared against `radius²`.
    pub fn intersects_sphere(&self, point: Vec3, radius: f32) -> bool {
        let s = self.to_local(point);
        let mut sq_dist = 0.0;
        for i in 0..3 {
            if s[i] < -self.extents[i] {
                sq_dist += (-self.extents[i] - s[i]) * (-self.extents[i] - s[i]);
            }
            if s[i] > self.extents[i] {
                sq_dist += (s[i] - self.extents[i]) * (s[i] - self.extents[i]);
            }
        }
        sq_dist <= radius * radius
    }
}
