//! Left-handed projection matrices with a 0..1 depth range

use glam::{Mat4, Vec4};

/// Perspective from a vertical field of view
#[inline]
pub fn perspective_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_lh(fov_y, aspect, near, far)
}

/// Off-axis perspective from near-plane bounds
pub fn frustum_lh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let w = right - left;
    let h = top - bottom;
    let d = far - near;
    Mat4::from_cols(
        Vec4::new(2.0 * near / w, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / h, 0.0, 0.0),
        Vec4::new(-(right + left) / w, -(top + bottom) / h, far / d, 1.0),
        Vec4::new(0.0, 0.0, -(far * near) / d, 0.0),
    )
}

#[inline]
pub fn orthographic_lh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::orthographic_lh(left, right, bottom, top, near, far)
}
