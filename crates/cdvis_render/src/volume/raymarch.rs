//! Per-frame raymarch draw

use crate::backend::{DrawCall, TextureBinding};
use crate::context::keywords;
use crate::frame::Frame;
use crate::resource::{BlendMode, CullMode, PipelineState};
use crate::Result;

use super::Volume;

/// Blended over the opaque scene, no depth test or write, back faces only
/// so the proxy still rasterizes with the camera inside it
pub const VOLUME_STATE: PipelineState = PipelineState {
    blend: BlendMode::Alpha,
    depth_test: false,
    depth_write: false,
    cull: CullMode::Front,
};

impl Volume {
    /// Resolve scene depth, bake if needed and draw the proxy cube
    pub(super) fn draw_volume(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let depth = frame.backend.resolve_depth()?;

        self.sync_transform(frame.graph)?;
        if self.is_dirty() {
            self.precompute(frame.graph, frame.backend)?;
        }

        self.volume_program
            .set_keyword(keywords::SAMPLECOUNT, self.params.display_sample_count);

        let world = frame.graph.world(self.node)?;
        let camera = &frame.camera;
        let model_view = camera.view * world.object_to_world;
        let u = &mut self.draw_uniforms;
        u.set("MVP", camera.projection * model_view);
        u.set("ViewToObject", model_view.inverse());
        u.set("InverseProjection", camera.inverse_projection);
        u.set(
            "CameraPosition",
            world.world_to_object.transform_point3(camera.world_position),
        );
        u.set("PlanePoint", self.params.plane_point);
        u.set("PlaneNormal", self.params.plane_normal);
        u.set("StepSize", self.params.step_size);
        u.set("ObjectToWorld", world.object_to_world);

        let textures = [
            // a bake left over from a cleared source must not be sampled
            TextureBinding {
                unit: 0,
                texture: self.source.as_ref().and(self.baked_texture()),
            },
            TextureBinding {
                unit: 1,
                texture: Some(depth),
            },
        ];
        let key = self.volume_program.active_key();
        frame.backend.draw(&DrawCall {
            program: &key,
            mesh: frame.context.cube,
            uniforms: &self.draw_uniforms,
            textures: &textures,
            state: VOLUME_STATE,
        })
    }
}
