//! Conversion of tracking-runtime poses into the engine's left-handed space
//!
//! Tracking runtimes report right-handed poses. Mirroring across the XY
//! plane flips the sign of z, and the matching quaternion keeps w and z
//! while negating x and y.

use glam::{Mat4, Quat, Vec3};

#[inline]
pub fn rh_to_lh_position(p: Vec3) -> Vec3 {
    Vec3::new(p.x, p.y, -p.z)
}

#[inline]
pub fn rh_to_lh_rotation(q: Quat) -> Quat {
    Quat::from_xyzw(-q.x, -q.y, q.z, q.w)
}

/// A rigid pose
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    #[inline]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    /// Convert a right-handed runtime pose into engine space
    pub fn from_right_handed(position: Vec3, orientation: Quat) -> Self {
        Self::new(rh_to_lh_position(position), rh_to_lh_rotation(orientation))
    }

    /// Convert a right-handed rigid device matrix into engine space
    pub fn from_right_handed_matrix(m: &Mat4) -> Self {
        let (_, rotation, translation) = m.to_scale_rotation_translation();
        Self::from_right_handed(translation, rotation.normalize())
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// Interpolate between poses
    pub fn lerp(&self, other: &Pose, t: f32) -> Pose {
        Pose::new(
            self.position.lerp(other.position, t),
            self.orientation.slerp(other.orientation, t),
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_flip() {
        assert_eq!(rh_to_lh_position(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(1.0, 2.0, -3.0));
    }

    #[test]
    fn test_rotation_mirrors() {
        // a right-handed rotation about y maps to the opposite turn in left-handed space
        let rh = Quat::from_rotation_y(0.4);
        let lh = rh_to_lh_rotation(rh);
        let v = Vec3::new(1.0, 0.0, 0.0);
        let mirrored = rh_to_lh_position(rh * v);
        assert!((lh * rh_to_lh_position(v)).abs_diff_eq(mirrored, 1e-5));
    }

    #[test]
    fn test_pose_from_matrix() {
        let m = Mat4::from_rotation_translation(Quat::IDENTITY, Vec3::new(0.0, 1.0, 2.0));
        let pose = Pose::from_right_handed_matrix(&m);
        assert!(pose.position.abs_diff_eq(Vec3::new(0.0, 1.0, -2.0), 1e-6));
        assert!(pose.orientation.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn test_pose_lerp() {
        let a = Pose::IDENTITY;
        let b = Pose::new(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY);
        assert!(a.lerp(&b, 0.5).position.abs_diff_eq(Vec3::X, 1e-6));
    }
}
