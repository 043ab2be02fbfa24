//! Tracked device state

use std::ops::BitOr;

use cdvis_math::{Pose, Quat, Vec2, Vec3};
use cdvis_scene::NodeId;

/// What a device is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceRole {
    Headset,
    LeftController,
    RightController,
    Other,
}

impl DeviceRole {
    pub fn is_controller(&self) -> bool {
        matches!(self, DeviceRole::LeftController | DeviceRole::RightController)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeviceRole::Headset => "headset",
            DeviceRole::LeftController => "left controller",
            DeviceRole::RightController => "right controller",
            DeviceRole::Other => "tracker",
        }
    }
}

/// Controller button mask
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Buttons(pub u32);

impl Buttons {
    pub const NONE: Self = Self(0);
    /// Grab
    pub const GRIP: Self = Self(1 << 0);
    /// Activate
    pub const TRIGGER: Self = Self(1 << 1);
    /// Pie menu select
    pub const TOUCHPAD: Self = Self(1 << 2);
    pub const MENU: Self = Self(1 << 3);

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// One tracked device as seen by the rest of the viewer.
///
/// Poses are already left-handed. `node` carries the pose into the scene
/// so interaction can read the device's world transform.
#[derive(Clone, Debug)]
pub struct TrackedDevice {
    index: u32,
    role: DeviceRole,
    node: NodeId,
    tracked: bool,
    pose: Pose,
    last_pose: Pose,
    buttons: Buttons,
    last_buttons: Buttons,
    touchpad: Vec2,
    haptics: Vec<u32>,
}

impl TrackedDevice {
    pub fn new(index: u32, role: DeviceRole, node: NodeId) -> Self {
        Self {
            index,
            role,
            node,
            tracked: false,
            pose: Pose::IDENTITY,
            last_pose: Pose::IDENTITY,
            buttons: Buttons::NONE,
            last_buttons: Buttons::NONE,
            touchpad: Vec2::ZERO,
            haptics: Vec::new(),
        }
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn role(&self) -> DeviceRole {
        self.role
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Pose in tracking space
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    pub fn touchpad(&self) -> Vec2 {
        self.touchpad
    }

    /// Start a new frame: the current state becomes the previous one
    pub fn advance(&mut self) {
        self.last_pose = self.pose;
        self.last_buttons = self.buttons;
    }

    /// Set the pose from a right-handed runtime pose
    pub fn set_pose_rh(&mut self, position: Vec3, orientation: Quat) {
        self.pose = Pose::from_right_handed(position, orientation);
        self.tracked = true;
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.tracked = true;
    }

    pub fn set_tracked(&mut self, tracked: bool) {
        self.tracked = tracked;
    }

    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.buttons = buttons;
    }

    pub fn set_touchpad(&mut self, touchpad: Vec2) {
        self.touchpad = touchpad;
    }

    /// Held this frame
    pub fn pressed(&self, button: Buttons) -> bool {
        self.buttons.contains(button)
    }

    /// Pressed this frame and not last frame
    pub fn pressed_edge(&self, button: Buttons) -> bool {
        self.buttons.contains(button) && !self.last_buttons.contains(button)
    }

    /// Released this frame
    pub fn released_edge(&self, button: Buttons) -> bool {
        !self.buttons.contains(button) && self.last_buttons.contains(button)
    }

    pub fn delta_position(&self) -> Vec3 {
        self.pose.position - self.last_pose.position
    }

    pub fn delta_rotation(&self) -> Quat {
        self.pose.orientation * self.last_pose.orientation.inverse()
    }

    /// Queue a haptic pulse
    pub fn pulse(&mut self, duration_us: u32) {
        self.haptics.push(duration_us);
    }

    pub fn take_haptics(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.haptics)
    }
}
