//! Hover, activate and drag
//!
//! Every frame each device is tested against the bounds of every
//! interactable. Targets are remembered by [`NodeId`]; a node destroyed
//! while hovered, activated or dragged is dropped from the device's state
//! without a callback.
//!
//! ```text
//! NotHovered ──enter radius──► Hovered ──trigger edge──► Activated
//!      ▲                          │  └────grip edge────► Dragging
//!      └────────leave radius──────┘
//! ```

use std::collections::BTreeMap;

use cdvis_core::HandleError;
use cdvis_math::{Obb, Quat, Vec3};
use cdvis_scene::{NodeId, SceneGraph};

use crate::device::{Buttons, TrackedDevice};
use crate::Result;

/// A scene node the controllers can touch.
///
/// Every callback has an empty default. The default [`Interactable::drag`]
/// moves the node to the proposed local pose.
pub trait Interactable {
    fn node(&self) -> NodeId;

    /// World-space bounds used for hover tests
    fn bounds(&self, graph: &mut SceneGraph) -> std::result::Result<Obb, HandleError>;

    fn draggable(&self) -> bool {
        false
    }

    fn on_hover_enter(&mut self, _device: &TrackedDevice) {}

    fn on_hover_exit(&mut self, _device: &TrackedDevice) {}

    fn on_activate_press(&mut self, _device: &TrackedDevice) {}

    fn on_activate_release(&mut self, _device: &TrackedDevice) {}

    fn on_drag_start(&mut self, _device: &TrackedDevice) {}

    fn on_drag_stop(&mut self, _device: &TrackedDevice) {}

    /// Follow the device. `position` and `rotation` are in the node's
    /// parent space.
    fn drag(
        &mut self,
        graph: &mut SceneGraph,
        _device: &TrackedDevice,
        position: Vec3,
        rotation: Quat,
    ) -> std::result::Result<(), HandleError> {
        graph.set_local_position(self.node(), position)?;
        graph.set_local_rotation(self.node(), rotation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    HoverEnter,
    HoverExit,
    ActivatePress,
    ActivateRelease,
    DragStart,
    DragStop,
}

/// Something that happened this frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InteractionEvent {
    pub device: u32,
    pub node: NodeId,
    pub kind: InteractionKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionConfig {
    /// Radius around the device origin used for hover tests
    pub hover_radius: f32,
    pub drag_start_haptic_us: u32,
    pub drag_stop_haptic_us: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            hover_radius: 0.025,
            drag_start_haptic_us: 600,
            drag_stop_haptic_us: 500,
        }
    }
}

/// An object held by a device, with its pose in the device's space at
/// grab time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragOperation {
    pub target: NodeId,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Clone, Debug, Default)]
struct DeviceState {
    hovered: Vec<NodeId>,
    activated: Vec<NodeId>,
    drags: Vec<DragOperation>,
}

#[derive(Default)]
pub struct InteractionEngine {
    config: InteractionConfig,
    states: BTreeMap<u32, DeviceState>,
    events: Vec<InteractionEvent>,
}

fn find<'a, 'b>(
    interactables: &'a mut [&'b mut dyn Interactable],
    node: NodeId,
) -> Option<&'a mut &'b mut dyn Interactable> {
    interactables.iter_mut().find(|i| i.node() == node)
}

impl InteractionEngine {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn hovered(&self, device: u32) -> &[NodeId] {
        self.states.get(&device).map(|s| s.hovered.as_slice()).unwrap_or(&[])
    }

    pub fn activated(&self, device: u32) -> &[NodeId] {
        self.states.get(&device).map(|s| s.activated.as_slice()).unwrap_or(&[])
    }

    pub fn drags(&self, device: u32) -> &[DragOperation] {
        self.states.get(&device).map(|s| s.drags.as_slice()).unwrap_or(&[])
    }

    /// Whether any device is dragging anything
    pub fn is_dragging(&self) -> bool {
        self.states.values().any(|s| !s.drags.is_empty())
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run one frame for every device, in index order
    pub fn update(
        &mut self,
        graph: &mut SceneGraph,
        devices: &mut [TrackedDevice],
        interactables: &mut [&mut dyn Interactable],
    ) -> Result<()> {
        let mut order: Vec<usize> = (0..devices.len()).collect();
        order.sort_by_key(|&i| devices[i].index());

        for i in order {
            let device = &mut devices[i];
            if !device.is_tracked() || !graph.contains(device.node()) {
                continue;
            }
            self.update_device(graph, device, interactables)?;
        }
        Ok(())
    }

    fn update_device(
        &mut self,
        graph: &mut SceneGraph,
        device: &mut TrackedDevice,
        interactables: &mut [&mut dyn Interactable],
    ) -> Result<()> {
        let index = device.index();
        let tip = graph.world_position(device.node())?;
        let mut candidates = Vec::new();
        for target in interactables.iter() {
            let node = target.node();
            if graph.contains(node) && target.bounds(graph)?.intersects_sphere(tip, self.config.hover_radius) {
                candidates.push(node);
            }
        }

        let state = self.states.entry(index).or_default();
        let events = &mut self.events;
        let mut emit = |node, kind| events.push(InteractionEvent { device: index, node, kind });

        // hover
        let mut kept = Vec::with_capacity(state.hovered.len());
        for node in state.hovered.drain(..) {
            if !graph.contains(node) {
                continue;
            }
            if candidates.contains(&node) {
                kept.push(node);
            } else if let Some(target) = find(interactables, node) {
                target.on_hover_exit(device);
                emit(node, InteractionKind::HoverExit);
            }
        }
        state.hovered = kept;
        for node in candidates {
            if !state.hovered.contains(&node) {
                if let Some(target) = find(interactables, node) {
                    target.on_hover_enter(device);
                }
                state.hovered.push(node);
                emit(node, InteractionKind::HoverEnter);
            }
        }

        // activate
        if device.pressed_edge(Buttons::TRIGGER) {
            for &node in &state.hovered {
                if state.activated.contains(&node) {
                    continue;
                }
                if let Some(target) = find(interactables, node) {
                    target.on_activate_press(device);
                    state.activated.push(node);
                    emit(node, InteractionKind::ActivatePress);
                }
            }
        }
        if !device.pressed(Buttons::TRIGGER) {
            for node in state.activated.drain(..) {
                if !graph.contains(node) {
                    continue;
                }
                if let Some(target) = find(interactables, node) {
                    target.on_activate_release(device);
                    emit(node, InteractionKind::ActivateRelease);
                }
            }
        }

        // drag start
        if device.pressed_edge(Buttons::GRIP) {
            let device_world = graph.world(device.node())?;
            for &node in &state.hovered {
                if state.drags.iter().any(|d| d.target == node) {
                    continue;
                }
                let Some(target) = find(interactables, node) else {
                    continue;
                };
                if !target.draggable() {
                    continue;
                }
                let object = graph.world(node)?;
                state.drags.push(DragOperation {
                    target: node,
                    position: device_world.world_to_object.transform_point3(object.position),
                    rotation: device_world.rotation.inverse() * object.rotation,
                });
                target.on_drag_start(device);
                device.pulse(self.config.drag_start_haptic_us);
                emit(node, InteractionKind::DragStart);
                log::debug!("Device {} started dragging {:?}", index, node);
            }
        }

        // drag continue or stop
        state.drags.retain(|d| graph.contains(d.target));
        if device.pressed(Buttons::GRIP) {
            if !state.drags.is_empty() {
                let device_world = graph.world(device.node())?;
                for drag in &state.drags {
                    let mut position = device_world.object_to_world.transform_point3(drag.position);
                    let mut rotation = device_world.rotation * drag.rotation;
                    if let Some(parent) = graph.parent(drag.target)? {
                        let parent_world = graph.world(parent)?;
                        position = parent_world.world_to_object.transform_point3(position);
                        rotation = parent_world.rotation.inverse() * rotation;
                    }
                    if let Some(target) = find(interactables, drag.target) {
                        target.drag(graph, device, position, rotation)?;
                    }
                }
            }
        } else {
            for drag in state.drags.drain(..) {
                if let Some(target) = find(interactables, drag.target) {
                    target.on_drag_stop(device);
                }
                device.pulse(self.config.drag_stop_haptic_us);
                emit(drag.target, InteractionKind::DragStop);
                log::debug!("Device {} stopped dragging {:?}", index, drag.target);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceRole;
    use cdvis_math::{Pose, Transform};

    struct Grabbable {
        node: NodeId,
        extents: Vec3,
        draggable: bool,
        hover_enters: u32,
        hover_exits: u32,
        releases: u32,
    }

    impl Grabbable {
        fn new(node: NodeId) -> Self {
            Self {
                node,
                extents: Vec3::splat(0.05),
                draggable: true,
                hover_enters: 0,
                hover_exits: 0,
                releases: 0,
            }
        }
    }

    impl Interactable for Grabbable {
        fn node(&self) -> NodeId {
            self.node
        }

        fn bounds(&self, graph: &mut SceneGraph) -> std::result::Result<Obb, HandleError> {
            let world = graph.world(self.node)?;
            Ok(Obb::new(world.position, self.extents, world.rotation))
        }

        fn draggable(&self) -> bool {
            self.draggable
        }

        fn on_hover_enter(&mut self, _device: &TrackedDevice) {
            self.hover_enters += 1;
        }

        fn on_hover_exit(&mut self, _device: &TrackedDevice) {
            self.hover_exits += 1;
        }

        fn on_activate_release(&mut self, _device: &TrackedDevice) {
            self.releases += 1;
        }
    }

    struct Rig {
        graph: SceneGraph,
        devices: Vec<TrackedDevice>,
        engine: InteractionEngine,
    }

    impl Rig {
        fn new() -> Self {
            let mut graph = SceneGraph::new();
            let node = graph.create("controller");
            let mut device = TrackedDevice::new(1, DeviceRole::RightController, node);
            device.set_pose(Pose::IDENTITY);
            Self {
                graph,
                devices: vec![device],
                engine: InteractionEngine::default(),
            }
        }

        /// Advance one frame with the controller at `position`
        fn step(&mut self, position: Vec3, buttons: Buttons, targets: &mut [&mut dyn Interactable]) {
            let device = &mut self.devices[0];
            device.advance();
            device.set_pose(Pose::new(position, Quat::IDENTITY));
            device.set_buttons(buttons);
            self.graph.set_local_position(device.node(), position).unwrap();
            self.engine.update(&mut self.graph, &mut self.devices, targets).unwrap();
        }

        fn kinds(&mut self) -> Vec<InteractionKind> {
            self.engine.drain_events().into_iter().map(|e| e.kind).collect()
        }
    }

    #[test]
    fn test_hover_enter_and_exit_once() {
        let mut rig = Rig::new();
        let node = rig.graph.create_with("box", Transform::from_position(Vec3::new(0.0, 0.0, 1.0)));
        let mut target = Grabbable::new(node);
        target.extents = Vec3::ZERO;

        rig.step(Vec3::ZERO, Buttons::NONE, &mut [&mut target]);
        assert!(rig.kinds().is_empty());

        // inside the 0.025 radius
        rig.step(Vec3::new(0.0, 0.0, 0.98), Buttons::NONE, &mut [&mut target]);
        rig.step(Vec3::new(0.0, 0.0, 0.99), Buttons::NONE, &mut [&mut target]);
        rig.step(Vec3::new(0.0, 0.01, 1.0), Buttons::NONE, &mut [&mut target]);
        assert_eq!(rig.kinds(), vec![InteractionKind::HoverEnter]);
        assert_eq!(target.hover_enters, 1);

        rig.step(Vec3::new(0.0, 0.0, 0.9), Buttons::NONE, &mut [&mut target]);
        rig.step(Vec3::new(0.0, 0.0, 0.8), Buttons::NONE, &mut [&mut target]);
        assert_eq!(rig.kinds(), vec![InteractionKind::HoverExit]);
        assert_eq!(target.hover_exits, 1);
    }

    #[test]
    fn test_drag_follows_device_and_stops() {
        let mut rig = Rig::new();
        let start = Vec3::new(0.0, 1.0, 0.5);
        let node = rig.graph.create_with("box", Transform::from_position(start));
        let mut target = Grabbable::new(node);
        let grab_at = start + Vec3::new(0.02, 0.0, 0.0);

        rig.step(grab_at, Buttons::NONE, &mut [&mut target]);
        rig.step(grab_at, Buttons::GRIP, &mut [&mut target]);
        assert_eq!(rig.engine.drags(1).len(), 1);
        assert_eq!(rig.devices[0].take_haptics(), vec![600]);

        let delta = Vec3::new(0.3, -0.2, 0.1);
        rig.step(grab_at + delta, Buttons::GRIP, &mut [&mut target]);
        let p = rig.graph.world_position(node).unwrap();
        assert!(p.abs_diff_eq(start + delta, 1e-5));

        rig.step(grab_at + delta, Buttons::NONE, &mut [&mut target]);
        assert_eq!(rig.devices[0].take_haptics(), vec![500]);
        assert!(rig.engine.drags(1).is_empty());
        let kinds = rig.kinds();
        assert!(kinds.contains(&InteractionKind::DragStart));
        assert!(kinds.contains(&InteractionKind::DragStop));

        rig.step(grab_at + delta * 3.0, Buttons::NONE, &mut [&mut target]);
        let p = rig.graph.world_position(node).unwrap();
        assert!(p.abs_diff_eq(start + delta, 1e-5));
    }

    #[test]
    fn test_drag_preserves_rotation_offset_under_parent() {
        let mut rig = Rig::new();
        let parent = rig.graph.create_with(
            "table",
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)).with_rotation(Quat::from_rotation_y(0.7)),
        );
        let node = rig.graph.create_child(parent, "box").unwrap();
        let mut target = Grabbable::new(node);
        let world_start = rig.graph.world_position(node).unwrap();

        rig.step(world_start, Buttons::NONE, &mut [&mut target]);
        rig.step(world_start, Buttons::GRIP, &mut [&mut target]);
        let object_rotation = rig.graph.world_rotation(node).unwrap();

        // twist the controller about its own origin
        let turn = Quat::from_rotation_x(0.4);
        let device = &mut rig.devices[0];
        device.advance();
        rig.graph.set_local_rotation(device.node(), turn).unwrap();
        rig.engine.update(&mut rig.graph, &mut rig.devices, &mut [&mut target]).unwrap();

        let r = rig.graph.world_rotation(node).unwrap();
        assert!(r.abs_diff_eq(turn * object_rotation, 1e-5));
        let p = rig.graph.world_position(node).unwrap();
        assert!(p.abs_diff_eq(world_start, 1e-5));
        assert_eq!(rig.graph.parent(node).unwrap(), Some(parent));
    }

    #[test]
    fn test_not_draggable_never_drags() {
        let mut rig = Rig::new();
        let node = rig.graph.create("panel");
        let mut target = Grabbable::new(node);
        target.draggable = false;

        rig.step(Vec3::ZERO, Buttons::GRIP, &mut [&mut target]);
        assert!(rig.engine.drags(1).is_empty());
        assert!(rig.devices[0].take_haptics().is_empty());
    }

    #[test]
    fn test_activate_release_always_fires() {
        let mut rig = Rig::new();
        let node = rig.graph.create("button");
        let mut target = Grabbable::new(node);

        rig.step(Vec3::ZERO, Buttons::TRIGGER, &mut [&mut target]);
        assert_eq!(rig.engine.activated(1), &[node]);

        // leave the bounds while holding, then let go
        rig.step(Vec3::new(1.0, 0.0, 0.0), Buttons::TRIGGER, &mut [&mut target]);
        rig.step(Vec3::new(1.0, 0.0, 0.0), Buttons::NONE, &mut [&mut target]);
        assert_eq!(target.releases, 1);
        assert!(rig.engine.activated(1).is_empty());
    }

    #[test]
    fn test_destroyed_target_dropped_silently() {
        let mut rig = Rig::new();
        let node = rig.graph.create("doomed");
        let mut target = Grabbable::new(node);

        rig.step(Vec3::ZERO, Buttons::GRIP, &mut [&mut target]);
        assert_eq!(rig.engine.drags(1).len(), 1);
        rig.kinds();
        rig.devices[0].take_haptics();

        rig.graph.destroy(node).unwrap();
        rig.step(Vec3::ZERO, Buttons::NONE, &mut []);
        assert!(rig.engine.drags(1).is_empty());
        assert!(rig.engine.hovered(1).is_empty());
        assert!(rig.kinds().is_empty());
        assert!(rig.devices[0].take_haptics().is_empty());
    }
}
