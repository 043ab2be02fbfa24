//! Desktop mouse and keyboard controls
//!
//! Left drag turns the volume, right drag flies the camera, the wheel
//! dollies and held keys nudge the volume parameters. Everything here is a
//! pure function of the input so the frame loop only applies results.

use cdvis_math::consts::FRAC_PI_2;
use cdvis_math::{Quat, Vec2, Vec3};
use cdvis_render::Volume;
use winit::keyboard::KeyCode;

use crate::input::InputState;

/// Radians of volume rotation per pixel of drag
pub const DRAG_SENSITIVITY: f32 = 0.003;
/// Radians of camera turn per pixel while looking
pub const LOOK_SENSITIVITY: f32 = 0.0025;
/// Fly speed in meters per second
pub const FLY_SPEED: f32 = 0.25;
pub const SPRINT_MULTIPLIER: f32 = 10.0;
/// Meters per wheel notch
pub const DOLLY_STEP: f32 = 0.03;

/// Rotation axes shorter than this are ignored
const MIN_DRAG_AXIS: f32 = 0.01;

/// Rotation to pre-multiply onto the volume's local rotation for a left
/// drag of `mouse_delta` pixels.
///
/// The axis is camera up scaled by the horizontal drag plus camera right
/// scaled by the vertical drag. With `roll` set to the cursor offset from
/// the window center, the drag rolls about the camera forward axis
/// instead, signed by whether it circles clockwise.
pub fn drag_rotation(camera_rotation: Quat, mouse_delta: Vec2, roll: Option<Vec2>) -> Option<Quat> {
    let axis = match roll {
        Some(offset) => {
            let tangent = Vec2::new(-offset.y, offset.x);
            camera_rotation * Vec3::Z * tangent.dot(mouse_delta)
        }
        None => camera_rotation * Vec3::Y * mouse_delta.x + camera_rotation * Vec3::X * mouse_delta.y,
    };
    if axis.length() <= MIN_DRAG_AXIS {
        return None;
    }
    Some(Quat::from_axis_angle(
        -axis.normalize(),
        mouse_delta.length() * DRAG_SENSITIVITY,
    ))
}

/// Yaw and pitch of the mouse-look camera
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlyCamera {
    pub yaw: f32,
    pub pitch: f32,
}

impl FlyCamera {
    /// Recover yaw and pitch from an existing orientation. Roll is lost.
    pub fn from_rotation(rotation: Quat) -> Self {
        let forward = rotation * Vec3::Z;
        Self {
            yaw: forward.x.atan2(forward.z),
            pitch: (-forward.y).clamp(-1.0, 1.0).asin(),
        }
    }

    pub fn look(&mut self, mouse_delta: Vec2) {
        self.yaw += mouse_delta.x * LOOK_SENSITIVITY;
        self.pitch = (self.pitch + mouse_delta.y * LOOK_SENSITIVITY).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }
}

/// Camera-local movement axes from W/S, A/D and Q/E
pub fn fly_axes(input: &InputState) -> Vec3 {
    Vec3::new(
        input.axis(KeyCode::KeyA, KeyCode::KeyD),
        input.axis(KeyCode::KeyQ, KeyCode::KeyE),
        input.axis(KeyCode::KeyS, KeyCode::KeyW),
    )
}

/// World-space displacement for one frame of flying
pub fn fly_offset(camera_rotation: Quat, axes: Vec3, sprint: bool, dt: f32) -> Vec3 {
    let speed = if sprint { FLY_SPEED * SPRINT_MULTIPLIER } else { FLY_SPEED };
    camera_rotation * axes * speed * dt
}

/// World-space displacement along the camera's forward axis
pub fn dolly_offset(camera_rotation: Quat, lines: f32) -> Vec3 {
    camera_rotation * Vec3::new(0.0, 0.0, lines * DOLLY_STEP)
}

/// Per-second rates of the held parameter keys
pub mod rates {
    pub const THRESHOLD: f32 = 0.2;
    pub const EXPOSURE: f32 = 1.0;
    pub const DENSITY: f32 = 0.5;
    pub const STEP_SIZE: f32 = 0.0002;
}

/// Parameter changes requested by the held keys this frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParameterNudge {
    pub threshold: f32,
    pub exposure: f32,
    pub density: f32,
    pub step_size: f32,
}

impl ParameterNudge {
    pub fn from_input(input: &InputState, dt: f32) -> Self {
        Self {
            threshold: input.axis(KeyCode::KeyZ, KeyCode::KeyX) * rates::THRESHOLD * dt,
            exposure: input.axis(KeyCode::KeyK, KeyCode::KeyL) * rates::EXPOSURE * dt,
            density: input.axis(KeyCode::KeyN, KeyCode::KeyM) * rates::DENSITY * dt,
            step_size: input.axis(KeyCode::KeyH, KeyCode::KeyJ) * rates::STEP_SIZE * dt,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply through the volume's setters so clamping and the bake state
    /// follow. Untouched parameters are left alone.
    pub fn apply(&self, volume: &mut Volume) {
        let current = volume.parameters().clone();
        if self.threshold != 0.0 {
            volume.set_threshold(current.threshold + self.threshold);
        }
        if self.exposure != 0.0 {
            volume.set_exposure(current.exposure + self.exposure);
        }
        if self.density != 0.0 {
            volume.set_density(current.density + self.density);
        }
        if self.step_size != 0.0 {
            volume.set_step_size(current.step_size + self.step_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdvis_render::{RecordingBackend, RenderContext, VolumeParameters};
    use cdvis_scene::SceneGraph;
    use winit::event::ElementState;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn volume() -> Volume {
        let mut backend = RecordingBackend::new();
        let library = cdvis_render::builtin_library().unwrap();
        let context = RenderContext::new(&mut backend, &library).unwrap();
        let mut graph = SceneGraph::new();
        Volume::new(graph.create("volume"), &context)
    }

    #[test]
    fn test_horizontal_drag_turns_about_camera_up() {
        let delta = drag_rotation(Quat::IDENTITY, Vec2::new(100.0, 0.0), None).unwrap();
        let (axis, angle) = delta.to_axis_angle();
        assert!(axis.abs_diff_eq(-Vec3::Y, 1e-5));
        assert!(approx(angle, 0.3));
    }

    #[test]
    fn test_vertical_drag_follows_camera_orientation() {
        let camera = Quat::from_rotation_y(FRAC_PI_2);
        let delta = drag_rotation(camera, Vec2::new(0.0, 10.0), None).unwrap();
        let (axis, angle) = delta.to_axis_angle();
        // camera right is world -Z after a quarter turn about +Y
        assert!(axis.abs_diff_eq(Vec3::Z, 1e-5));
        assert!(approx(angle, 0.03));
    }

    #[test]
    fn test_tiny_drag_is_ignored() {
        assert!(drag_rotation(Quat::IDENTITY, Vec2::new(0.005, 0.0), None).is_none());
        assert!(drag_rotation(Quat::IDENTITY, Vec2::ZERO, None).is_none());
    }

    #[test]
    fn test_roll_drag_uses_forward_axis() {
        // cursor right of center moving down circles clockwise on screen
        let delta = drag_rotation(Quat::IDENTITY, Vec2::new(0.0, 10.0), Some(Vec2::new(50.0, 0.0))).unwrap();
        let (axis, _) = delta.to_axis_angle();
        assert!(axis.abs_diff_eq(-Vec3::Z, 1e-5));

        let reverse = drag_rotation(Quat::IDENTITY, Vec2::new(0.0, -10.0), Some(Vec2::new(50.0, 0.0))).unwrap();
        let (axis, _) = reverse.to_axis_angle();
        assert!(axis.abs_diff_eq(Vec3::Z, 1e-5));

        // moving straight toward the center does not roll
        assert!(drag_rotation(Quat::IDENTITY, Vec2::new(-10.0, 0.0), Some(Vec2::new(50.0, 0.0))).is_none());
    }

    #[test]
    fn test_look_clamps_pitch() {
        let mut fly = FlyCamera::default();
        fly.look(Vec2::new(400.0, 0.0));
        assert!(approx(fly.yaw, 1.0));
        fly.look(Vec2::new(0.0, 10_000.0));
        assert!(approx(fly.pitch, FRAC_PI_2));
        fly.look(Vec2::new(0.0, -100_000.0));
        assert!(approx(fly.pitch, -FRAC_PI_2));
    }

    #[test]
    fn test_fly_camera_round_trips_rotation() {
        let fly = FlyCamera { yaw: 0.7, pitch: -0.3 };
        let back = FlyCamera::from_rotation(fly.rotation());
        assert!(approx(back.yaw, 0.7));
        assert!(approx(back.pitch, -0.3));
        assert_eq!(FlyCamera::from_rotation(Quat::IDENTITY), FlyCamera::default());
    }

    #[test]
    fn test_fly_offset_and_sprint() {
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyW, ElementState::Pressed, false);
        input.set_key(KeyCode::KeyE, ElementState::Pressed, false);
        let axes = fly_axes(&input);
        assert_eq!(axes, Vec3::new(0.0, 1.0, 1.0));

        let step = fly_offset(Quat::IDENTITY, Vec3::Z, false, 2.0);
        assert!(step.abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), 1e-6));
        let sprint = fly_offset(Quat::IDENTITY, Vec3::Z, true, 2.0);
        assert!(sprint.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-6));

        let turned = fly_offset(Quat::from_rotation_y(FRAC_PI_2), Vec3::Z, false, 1.0);
        assert!(turned.abs_diff_eq(Vec3::new(0.25, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_dolly_moves_along_forward() {
        assert!(dolly_offset(Quat::IDENTITY, 2.0).abs_diff_eq(Vec3::new(0.0, 0.0, 0.06), 1e-6));
        assert!(dolly_offset(Quat::IDENTITY, -1.0).abs_diff_eq(Vec3::new(0.0, 0.0, -0.03), 1e-6));
    }

    #[test]
    fn test_held_keys_nudge_parameters() {
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyX, ElementState::Pressed, false);
        input.set_key(KeyCode::KeyK, ElementState::Pressed, false);
        input.set_key(KeyCode::KeyH, ElementState::Pressed, false);
        let nudge = ParameterNudge::from_input(&input, 0.5);
        assert!(approx(nudge.threshold, 0.1));
        assert!(approx(nudge.exposure, -0.5));
        assert_eq!(nudge.density, 0.0);
        assert!(approx(nudge.step_size, -0.0001));

        let mut volume = volume();
        let defaults = VolumeParameters::default();
        nudge.apply(&mut volume);
        let p = volume.parameters();
        assert!(approx(p.threshold, defaults.threshold + 0.1));
        assert!(approx(p.exposure, defaults.exposure - 0.5));
        assert_eq!(p.density, defaults.density);
        assert!(approx(p.step_size, defaults.step_size - 0.0001));
    }

    #[test]
    fn test_nudges_respect_limits() {
        let mut volume = volume();
        let nudge = ParameterNudge {
            threshold: 5.0,
            exposure: -10.0,
            density: -10.0,
            step_size: -1.0,
        };
        nudge.apply(&mut volume);
        let p = volume.parameters();
        assert_eq!(p.threshold, 1.0);
        assert_eq!(p.exposure, 0.0);
        assert_eq!(p.density, 0.0);
        assert_eq!(p.step_size, VolumeParameters::MIN_STEP_SIZE);
        assert!(ParameterNudge::default().is_empty());
    }
}
