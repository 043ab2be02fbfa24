//! # cdvis_math - CDVis Math
//!
//! Thin layer over `glam` holding the spatial conventions of the viewer:
//! left-handed world space with +Y up and +Z forward, TRS transforms
//! composed parent-first, oriented bounds for interaction queries, and
//! the conversion from right-handed tracking-runtime poses.

pub mod bounds;
pub mod handedness;
pub mod projection;
pub mod transform;

pub use bounds::*;
pub use handedness::*;
pub use projection::*;
pub use transform::*;

pub use glam::{Mat3, Mat4, Quat, UVec3, Vec2, Vec3, Vec4};

/// Common math constants
pub mod consts {
    pub const PI: f32 = core::f32::consts::PI;
    pub const TAU: f32 = PI * 2.0;
    pub const FRAC_PI_2: f32 = PI / 2.0;
    pub const DEG_TO_RAD: f32 = PI / 180.0;
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
    pub const EPSILON: f32 = 1e-5;
}

/// Convert degrees to radians
#[inline]
pub fn radians(degrees: f32) -> f32 {
    degrees * consts::DEG_TO_RAD
}

/// Convert radians to degrees
#[inline]
pub fn degrees(radians: f32) -> f32 {
    radians * consts::RAD_TO_DEG
}

/// Wrap an angle into [0, TAU)
#[inline]
pub fn wrap_angle(mut angle: f32) -> f32 {
    angle %= consts::TAU;
    if angle < 0.0 {
        angle += consts::TAU;
    }
    angle
}

pub mod prelude {
    pub use crate::bounds::{Aabb, Obb};
    pub use crate::handedness::{rh_to_lh_position, rh_to_lh_rotation, Pose};
    pub use crate::transform::Transform;
    pub use crate::{Mat4, Quat, Vec2, Vec3, Vec4};
}
