//! Draws a mesh at a scene node

use cdvis_math::{Aabb, Obb, Vec4};
use cdvis_scene::{NodeId, SceneGraph};
use cdvis_shader::ShaderProgram;

use crate::backend::DrawCall;
use crate::context::queue;
use crate::frame::{Frame, Renderer};
use crate::resource::{MeshHandle, PipelineState};
use crate::uniform::{UniformBlock, UniformValue};
use crate::Result;

pub struct MeshRenderer {
    node: NodeId,
    mesh: MeshHandle,
    bounds: Aabb,
    program: ShaderProgram,
    uniforms: UniformBlock,
    state: PipelineState,
    queue: u32,
    visible: bool,
}

impl MeshRenderer {
    pub fn new(node: NodeId, mesh: MeshHandle, bounds: Aabb, program: ShaderProgram) -> Self {
        Self {
            node,
            mesh,
            bounds,
            program,
            uniforms: UniformBlock::new(),
            state: PipelineState::OPAQUE,
            queue: queue::OPAQUE,
            visible: true,
        }
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn set_mesh(&mut self, mesh: MeshHandle, bounds: Aabb) {
        self.mesh = mesh;
        self.bounds = bounds;
    }

    pub fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.uniforms.set(name, value);
    }

    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    /// Shorthand for the unlit shader's `Color`
    pub fn set_color(&mut self, color: Vec4) {
        self.uniforms.set("Color", color);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_render_queue(&mut self, queue: u32) {
        self.queue = queue;
    }

    pub fn set_state(&mut self, state: PipelineState) {
        self.state = state;
    }

    /// Mesh bounds carried into world space
    pub fn bounds(&self, graph: &mut SceneGraph) -> Result<Obb> {
        let world = graph.world(self.node)?;
        Ok(self
            .bounds
            .to_world(&world.object_to_world, world.scale, world.rotation))
    }
}

impl Renderer for MeshRenderer {
    fn render_queue(&self) -> u32 {
        self.queue
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn draw(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let object_to_world = frame.graph.object_to_world(self.node)?;
        self.uniforms.set("ObjectToWorld", object_to_world);
        self.uniforms.set("ViewProjection", frame.camera.view_projection);

        let key = self.program.active_key();
        frame.backend.draw(&DrawCall {
            program: &key,
            mesh: self.mesh,
            uniforms: &self.uniforms,
            textures: &[],
            state: self.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;
    use crate::recording::{Command, RecordingBackend};
    use cdvis_math::consts::FRAC_PI_2;
    use cdvis_math::{Mat4, Quat, Transform, Vec3};
    use cdvis_scene::CameraMatrices;

    fn camera() -> CameraMatrices {
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0));
        CameraMatrices {
            view,
            projection: Mat4::IDENTITY,
            view_projection: view,
            inverse_projection: Mat4::IDENTITY,
            world_position: Vec3::new(0.0, 0.0, -2.0),
        }
    }

    #[test]
    fn test_draw_supplies_transform_uniforms() {
        let mut backend = RecordingBackend::new();
        let context = test_context(&mut backend);
        let mut graph = SceneGraph::new();
        let node = graph.create_with("marker", Transform::from_position(Vec3::X));

        let mut renderer = MeshRenderer::new(node, context.cube, context.cube_bounds, context.unlit_program.clone());
        renderer.set_color(Vec4::ONE);
        backend.drain();

        let mut frame = Frame {
            context: &context,
            graph: &mut graph,
            camera: camera(),
            backend: &mut backend,
        };
        renderer.draw(&mut frame).unwrap();

        let commands = backend.drain();
        let Command::Draw { uniforms, index_count, state, .. } = &commands[0] else {
            panic!("expected a draw, got {:?}", commands);
        };
        assert_eq!(*index_count, 36);
        assert_eq!(*state, PipelineState::OPAQUE);
        assert_eq!(
            uniforms.get("ObjectToWorld"),
            Some(&UniformValue::Mat4(Mat4::from_translation(Vec3::X)))
        );
        assert_eq!(uniforms.get("ViewProjection"), Some(&UniformValue::Mat4(camera().view_projection)));
        assert_eq!(uniforms.get("Color"), Some(&UniformValue::Vec4(Vec4::ONE)));
    }

    #[test]
    fn test_bounds_follow_world_transform() {
        let mut backend = RecordingBackend::new();
        let context = test_context(&mut backend);
        let mut graph = SceneGraph::new();
        let local = Transform::from_position(Vec3::new(0.0, 1.0, 0.0))
            .with_rotation(Quat::from_rotation_y(FRAC_PI_2))
            .with_scale(Vec3::new(2.0, 1.0, 1.0));
        let node = graph.create_with("box", local);
        let renderer = MeshRenderer::new(node, context.cube, context.cube_bounds, context.unlit_program.clone());

        let obb = renderer.bounds(&mut graph).unwrap();
        assert!(obb.center.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
        assert!(obb.extents.abs_diff_eq(Vec3::new(1.0, 0.5, 0.5), 1e-5));
        // long axis now lies along world z
        assert!(obb.contains_point(Vec3::new(0.0, 1.0, 0.9)));
        assert!(!obb.contains_point(Vec3::new(0.9, 1.0, 0.0)));
    }

    #[test]
    fn test_hidden_renderer_not_drawn() {
        let mut backend = RecordingBackend::new();
        let context = test_context(&mut backend);
        let mut graph = SceneGraph::new();
        let node = graph.create("hidden");
        let mut renderer = MeshRenderer::new(node, context.cube, context.cube_bounds, context.unlit_program.clone());
        renderer.set_visible(false);

        let mut frame = Frame {
            context: &context,
            graph: &mut graph,
            camera: camera(),
            backend: &mut backend,
        };
        let mut renderers: Vec<&mut dyn Renderer> = vec![&mut renderer];
        crate::frame::draw_sorted(&mut renderers, &mut frame).unwrap();
        assert_eq!(backend.count(|c| matches!(c, Command::Draw { .. })), 0);
    }
}
