//! Radial touchpad menu

use cdvis_core::HandleError;
use cdvis_math::consts::{FRAC_PI_2, TAU};
use cdvis_math::{wrap_angle, Obb, Vec2, Vec3};
use cdvis_scene::{NodeId, SceneGraph};

/// Slices laid out clockwise from the top of the touchpad
#[derive(Clone, Debug)]
pub struct PieMenu {
    node: NodeId,
    radius: f32,
    labels: Vec<String>,
    hovered: Option<usize>,
    selected: usize,
    visible: bool,
}

impl PieMenu {
    pub const DEFAULT_RADIUS: f32 = 0.06;

    pub fn new<I, S>(node: NodeId, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            node,
            radius: Self::DEFAULT_RADIUS,
            labels: labels.into_iter().map(Into::into).collect(),
            hovered: None,
            selected: 0,
            visible: false,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn slice_count(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, slice: usize) -> Option<&str> {
        self.labels.get(slice).map(String::as_str)
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.hovered = None;
        }
    }

    /// Slice under a touchpad position
    pub fn slice_at(touchpad: Vec2, slices: usize) -> usize {
        if slices == 0 {
            return 0;
        }
        let angle = wrap_angle(touchpad.y.atan2(touchpad.x) + FRAC_PI_2);
        let slice = (angle / (TAU / slices as f32)).floor() as usize;
        slice.min(slices - 1)
    }

    /// Track the touchpad. Returns whether the hovered slice changed.
    pub fn update_touchpad(&mut self, touchpad: Vec2) -> bool {
        let slice = Self::slice_at(touchpad, self.labels.len());
        let changed = self.hovered != Some(slice);
        self.hovered = Some(slice);
        changed
    }

    /// Make the hovered slice the active one
    pub fn select_hovered(&mut self) -> Option<usize> {
        let slice = self.hovered?;
        self.selected = slice;
        log::debug!("Pie menu selected '{}'", self.labels[slice]);
        Some(slice)
    }

    pub fn bounds(&self, graph: &mut SceneGraph) -> Result<Obb, HandleError> {
        let world = graph.world(self.node)?;
        Ok(Obb::new(
            world.position,
            Vec3::new(self.radius, self.radius, 0.01),
            world.rotation,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_at_quadrants() {
        // angle = atan2(y, x) + pi/2
        assert_eq!(PieMenu::slice_at(Vec2::new(1.0, 0.0), 4), 1);
        assert_eq!(PieMenu::slice_at(Vec2::new(0.0, 1.0), 4), 2);
        assert_eq!(PieMenu::slice_at(Vec2::new(-1.0, 0.1), 4), 2);
        assert_eq!(PieMenu::slice_at(Vec2::new(0.1, -1.0), 4), 0);
        assert_eq!(PieMenu::slice_at(Vec2::new(-1.0, -0.1), 4), 3);
        assert_eq!(PieMenu::slice_at(Vec2::new(1.0, 0.0), 0), 0);
    }

    #[test]
    fn test_hover_change_and_select() {
        let mut graph = SceneGraph::new();
        let mut menu = PieMenu::new(graph.create("menu"), ["clip", "paint", "erase"]);
        assert!(menu.select_hovered().is_none());

        assert!(menu.update_touchpad(Vec2::new(0.05, -1.0)));
        assert!(!menu.update_touchpad(Vec2::new(0.1, -1.0)));
        assert_eq!(menu.hovered(), Some(0));
        assert!(menu.update_touchpad(Vec2::new(0.0, 1.0)));

        assert_eq!(menu.select_hovered(), Some(1));
        assert_eq!(menu.selected(), 1);
        assert_eq!(menu.label(1), Some("paint"));
    }

    #[test]
    fn test_bounds_are_flat_disc() {
        let mut graph = SceneGraph::new();
        let node = graph.create_with("menu", cdvis_math::Transform::from_position(Vec3::Y));
        let menu = PieMenu::new(node, ["a"]);
        let b = menu.bounds(&mut graph).unwrap();
        assert_eq!(b.center, Vec3::Y);
        assert_eq!(b.extents, Vec3::new(0.06, 0.06, 0.01));
    }
}
