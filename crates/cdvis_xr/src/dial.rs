//! A twistable value dial

use cdvis_core::HandleError;
use cdvis_math::consts::{PI, TAU};
use cdvis_math::{Obb, Quat, Vec3};
use cdvis_scene::{NodeId, SceneGraph};

use crate::device::TrackedDevice;
use crate::interaction::Interactable;

/// Grabbing a dial and twisting the controller about the dial's up axis
/// changes its value by one full range per turn. The dial never moves.
#[derive(Clone, Debug)]
pub struct Dial {
    node: NodeId,
    label: String,
    value: f32,
    min: f32,
    max: f32,
    steps: u32,
    radius: f32,
    grab_value: f32,
}

impl Dial {
    pub const DEFAULT_RADIUS: f32 = 0.04;

    pub fn new(node: NodeId, label: impl Into<String>) -> Self {
        Self {
            node,
            label: label.into(),
            value: 0.2,
            min: 0.0,
            max: 1.0,
            steps: 20,
            radius: Self::DEFAULT_RADIUS,
            grab_value: 0.2,
        }
    }

    pub fn with_range(mut self, min: f32, max: f32, steps: u32) -> Self {
        self.min = min.min(max);
        self.max = max.max(min);
        self.steps = steps.max(1);
        self.value = self.snap(self.value);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = self.snap(value);
    }

    /// Snap to the step grid and clamp into range
    pub fn snap(&self, value: f32) -> f32 {
        let step = (self.max - self.min) / self.steps as f32;
        if step <= 0.0 {
            return self.min;
        }
        let snapped = self.min + ((value - self.min) / step).round() * step;
        snapped.clamp(self.min, self.max)
    }

    /// Signed twist of `rotation` about local +Y, in (-PI, PI]
    fn twist(rotation: Quat) -> f32 {
        let mut angle = 2.0 * rotation.y.atan2(rotation.w);
        if angle > PI {
            angle -= TAU;
        } else if angle <= -PI {
            angle += TAU;
        }
        angle
    }
}

impl Interactable for Dial {
    fn node(&self) -> NodeId {
        self.node
    }

    fn bounds(&self, graph: &mut SceneGraph) -> Result<Obb, HandleError> {
        let world = graph.world(self.node)?;
        Ok(Obb::new(
            world.position,
            Vec3::new(self.radius, 0.01, self.radius) * world.scale.abs(),
            world.rotation,
        ))
    }

    fn draggable(&self) -> bool {
        true
    }

    fn on_drag_start(&mut self, _device: &TrackedDevice) {
        self.grab_value = self.value;
    }

    fn drag(
        &mut self,
        graph: &mut SceneGraph,
        _device: &TrackedDevice,
        _position: Vec3,
        rotation: Quat,
    ) -> Result<(), HandleError> {
        let current = graph.local(self.node)?.rotation;
        let twist = Self::twist(current.inverse() * rotation);
        let range = self.max - self.min;
        self.value = self.snap(self.grab_value + twist / TAU * range);
        Ok(())
    }
}
