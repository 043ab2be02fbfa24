//! Per-frame device polling

use cdvis_scene::{NodeId, SceneGraph};

use crate::backend::{SessionState, View, XrBackend};
use crate::device::TrackedDevice;
use crate::{Result, XrError};

/// Owns the active backend and the devices it reports.
///
/// Devices are kept sorted by index. Each gets a scene node parented to
/// the tracking-space rig so its world transform follows the rig.
pub struct XrSystem {
    backend: Box<dyn XrBackend>,
    devices: Vec<TrackedDevice>,
    initialized: bool,
    frame_index: u64,
}

impl XrSystem {
    pub fn new(backend: Box<dyn XrBackend>) -> Self {
        Self {
            backend,
            devices: Vec::new(),
            initialized: false,
            frame_index: 0,
        }
    }

    pub fn initialize(&mut self) -> Result<()> {
        if !self.backend.is_available() {
            return Err(XrError::NotSupported(format!(
                "backend '{}' has no headset",
                self.backend.name()
            )));
        }
        self.backend.initialize()?;
        self.initialized = true;
        log::info!("XR initialized with '{}' backend", self.backend.name());
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if self.initialized {
            self.backend.shutdown();
            self.initialized = false;
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn session_state(&self) -> SessionState {
        self.backend.session_state()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Poll the backend and push every device pose into the scene
    pub fn begin_frame(&mut self, graph: &mut SceneGraph, rig: NodeId) -> Result<()> {
        if !self.initialized {
            return Err(XrError::NotInitialized);
        }
        for device in &mut self.devices {
            device.advance();
        }

        for input in self.backend.poll_devices()? {
            let slot = match self.devices.binary_search_by_key(&input.index, TrackedDevice::index) {
                Ok(i) => i,
                Err(i) => {
                    let node = graph.create_child(rig, input.role.name())?;
                    log::debug!("Tracking new {} at index {}", input.role.name(), input.index);
                    self.devices
                        .insert(i, TrackedDevice::new(input.index, input.role, node));
                    i
                }
            };
            let device = &mut self.devices[slot];
            device.set_buttons(input.buttons);
            device.set_touchpad(input.touchpad);
            if input.tracked {
                device.set_pose_rh(input.position, input.orientation);
                let pose = device.pose();
                graph.set_local_position(device.node(), pose.position)?;
                graph.set_local_rotation(device.node(), pose.orientation)?;
            } else {
                device.set_tracked(false);
            }
        }

        self.frame_index += 1;
        Ok(())
    }

    /// Send every queued haptic pulse to the backend
    pub fn end_frame(&mut self) -> Result<()> {
        for device in &mut self.devices {
            for duration in device.take_haptics() {
                self.backend.trigger_haptic(device.index(), duration);
            }
        }
        Ok(())
    }

    pub fn devices(&self) -> &[TrackedDevice] {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut [TrackedDevice] {
        &mut self.devices
    }

    pub fn device(&self, index: u32) -> Option<&TrackedDevice> {
        self.devices.iter().find(|d| d.index() == index)
    }

    pub fn views(&self) -> Vec<View> {
        self.backend.views()
    }
}

impl Drop for XrSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceInput, SimulatedXrBackend};
    use crate::device::{Buttons, DeviceRole};
    use cdvis_math::{Quat, Vec3};

    #[test]
    fn test_begin_frame_requires_initialize() {
        let mut graph = SceneGraph::new();
        let rig = graph.create("rig");
        let mut xr = XrSystem::new(Box::new(SimulatedXrBackend::new()));
        assert!(matches!(xr.begin_frame(&mut graph, rig), Err(XrError::NotInitialized)));
    }

    #[test]
    fn test_devices_sorted_and_posed() {
        let mut backend = SimulatedXrBackend::new();
        backend.push_frame(vec![
            DeviceInput::new(3, DeviceRole::LeftController).with_pose(Vec3::new(0.0, 1.0, 2.0), Quat::IDENTITY),
            DeviceInput::new(0, DeviceRole::Headset),
        ]);
        let mut graph = SceneGraph::new();
        let rig = graph.create_with("rig", cdvis_math::Transform::from_position(Vec3::X));
        let mut xr = XrSystem::new(Box::new(backend));
        xr.initialize().unwrap();
        xr.begin_frame(&mut graph, rig).unwrap();

        let indices: Vec<u32> = xr.devices().iter().map(|d| d.index()).collect();
        assert_eq!(indices, vec![0, 3]);

        let left = xr.device(3).unwrap();
        assert_eq!(graph.parent(left.node()).unwrap(), Some(rig));
        // z flipped, then offset by the rig
        let world = graph.world_position(left.node()).unwrap();
        assert!(world.abs_diff_eq(Vec3::new(1.0, 1.0, -2.0), 1e-6));
    }

    #[test]
    fn test_edges_across_frames_and_haptics() {
        let mut backend = SimulatedXrBackend::new();
        let right = DeviceInput::new(1, DeviceRole::RightController);
        backend.push_frame(vec![right.with_buttons(Buttons::GRIP)]);
        backend.push_frame(vec![right.with_buttons(Buttons::GRIP)]);
        let mut graph = SceneGraph::new();
        let rig = graph.create("rig");
        let mut xr = XrSystem::new(Box::new(backend));
        xr.initialize().unwrap();

        xr.begin_frame(&mut graph, rig).unwrap();
        assert!(xr.device(1).unwrap().pressed_edge(Buttons::GRIP));
        xr.devices_mut()[0].pulse(600);
        xr.end_frame().unwrap();

        xr.begin_frame(&mut graph, rig).unwrap();
        let device = xr.device(1).unwrap();
        assert!(device.pressed(Buttons::GRIP));
        assert!(!device.pressed_edge(Buttons::GRIP));
        assert_eq!(xr.frame_index(), 2);
        assert!(xr.devices_mut()[0].take_haptics().is_empty());
    }
}
