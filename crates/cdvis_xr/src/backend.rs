//! XR runtime seam

use std::collections::VecDeque;

use cdvis_math::{Pose, Quat, Vec2, Vec3, Vec4};

use crate::device::{Buttons, DeviceRole};
use crate::{Result, XrError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

/// One eye to render
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct View {
    pub eye: Eye,
    /// Eye pose in tracking space, left-handed
    pub pose: Pose,
    /// Tangents of the half angles: left, right, bottom, top
    pub tangents: Vec4,
}

/// Raw per-frame state of one device, straight from the runtime
/// (right-handed)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceInput {
    pub index: u32,
    pub role: DeviceRole,
    pub tracked: bool,
    pub position: Vec3,
    pub orientation: Quat,
    pub buttons: Buttons,
    pub touchpad: Vec2,
}

impl DeviceInput {
    pub fn new(index: u32, role: DeviceRole) -> Self {
        Self {
            index,
            role,
            tracked: true,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            buttons: Buttons::NONE,
            touchpad: Vec2::ZERO,
        }
    }

    pub fn with_pose(mut self, position: Vec3, orientation: Quat) -> Self {
        self.position = position;
        self.orientation = orientation;
        self
    }

    pub fn with_buttons(mut self, buttons: Buttons) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_touchpad(mut self, touchpad: Vec2) -> Self {
        self.touchpad = touchpad;
        self
    }
}

/// What the viewer needs from a VR runtime
pub trait XrBackend: Send {
    fn name(&self) -> &str;

    fn initialize(&mut self) -> Result<()>;

    fn shutdown(&mut self);

    /// Whether a headset is present
    fn is_available(&self) -> bool;

    fn session_state(&self) -> SessionState;

    /// Current state of every known device
    fn poll_devices(&mut self) -> Result<Vec<DeviceInput>>;

    /// Per-eye views relative to the headset
    fn views(&self) -> Vec<View>;

    fn trigger_haptic(&mut self, device: u32, duration_us: u32);
}

/// Replays scripted device frames.
///
/// Each poll consumes one queued frame; once the queue is empty the last
/// frame repeats.
#[derive(Debug, Default)]
pub struct SimulatedXrBackend {
    state: SessionState,
    frames: VecDeque<Vec<DeviceInput>>,
    current: Vec<DeviceInput>,
    haptics: Vec<(u32, u32)>,
    eye_separation: f32,
}

impl SimulatedXrBackend {
    pub const DEFAULT_EYE_SEPARATION: f32 = 0.064;

    pub fn new() -> Self {
        Self {
            eye_separation: Self::DEFAULT_EYE_SEPARATION,
            ..Default::default()
        }
    }

    /// Queue one frame of device state
    pub fn push_frame(&mut self, devices: Vec<DeviceInput>) {
        self.frames.push_back(devices);
    }

    /// Replace one device in the repeating frame
    pub fn set_device(&mut self, input: DeviceInput) {
        match self.current.iter_mut().find(|d| d.index == input.index) {
            Some(d) => *d = input,
            None => self.current.push(input),
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Every haptic pulse requested so far as (device, microseconds)
    pub fn haptics(&self) -> &[(u32, u32)] {
        &self.haptics
    }
}

impl XrBackend for SimulatedXrBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn initialize(&mut self) -> Result<()> {
        self.state = SessionState::Running;
        log::info!("Simulated XR session running");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state = SessionState::Stopped;
    }

    fn is_available(&self) -> bool {
        true
    }

    fn session_state(&self) -> SessionState {
        self.state
    }

    fn poll_devices(&mut self) -> Result<Vec<DeviceInput>> {
        if self.state != SessionState::Running {
            return Err(XrError::NotInitialized);
        }
        if let Some(frame) = self.frames.pop_front() {
            self.current = frame;
        }
        Ok(self.current.clone())
    }

    fn views(&self) -> Vec<View> {
        let half = self.eye_separation * 0.5;
        let tangents = Vec4::new(-1.0, 1.0, -1.0, 1.0);
        vec![
            View {
                eye: Eye::Left,
                pose: Pose::new(Vec3::new(-half, 0.0, 0.0), Quat::IDENTITY),
                tangents,
            },
            View {
                eye: Eye::Right,
                pose: Pose::new(Vec3::new(half, 0.0, 0.0), Quat::IDENTITY),
                tangents,
            },
        ]
    }

    fn trigger_haptic(&mut self, device: u32, duration_us: u32) {
        self.haptics.push((device, duration_us));
    }
}
