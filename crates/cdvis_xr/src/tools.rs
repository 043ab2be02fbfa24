//! Controller tools chosen from the pie menu

use cdvis_math::Vec3;
use cdvis_scene::{NodeId, SceneGraph};

use crate::device::{Buttons, TrackedDevice};
use crate::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tool {
    #[default]
    ClipPlane,
    Paint,
    Erase,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::ClipPlane, Tool::Paint, Tool::Erase];

    pub fn label(&self) -> &'static str {
        match self {
            Tool::ClipPlane => "Clip plane",
            Tool::Paint => "Paint",
            Tool::Erase => "Erase",
        }
    }

    /// Tool for a pie-menu slice
    pub fn from_slice(slice: usize) -> Option<Tool> {
        Self::ALL.get(slice).copied()
    }
}

/// Clip plane carried by the tool controller, as (point, normal) in the
/// volume node's local space.
///
/// `None` unless the tool is the clip plane, the trigger is held and
/// nothing is being dragged. Paint and erase do nothing yet.
pub fn clip_plane(
    tool: Tool,
    device: &TrackedDevice,
    dragging: bool,
    graph: &mut SceneGraph,
    volume: NodeId,
) -> Result<Option<(Vec3, Vec3)>> {
    if tool != Tool::ClipPlane || dragging || !device.pressed(Buttons::TRIGGER) {
        return Ok(None);
    }
    let controller = graph.world(device.node())?;
    let target = graph.world(volume)?;

    let point = target.world_to_object.transform_point3(controller.position);
    // normals go through the inverse transpose of world_to_object
    let forward = controller.rotation * Vec3::Z;
    let normal = target
        .object_to_world
        .transpose()
        .transform_vector3(forward)
        .normalize_or_zero();
    Ok(Some((point, normal)))
}
