//! Volumetric rendering of a loaded scan
//!
//! A [`Volume`] owns two 3D textures: the source uploaded from the loader
//! (intensity and auxiliary channel) and a baked copy holding density and
//! received light. The bake runs on the GPU only when something it reads
//! has changed:
//!
//! ```text
//! set_source / parameter setter / node moved ──► Dirty
//! Dirty ──precompute()──► Clean
//! ```
//!
//! Drawing raymarches the baked texture inside the context's unit cube.

mod params;
mod precompute;
mod raymarch;

pub use params::VolumeParameters;

use cdvis_math::{Obb, Vec3};
use cdvis_scene::{NodeId, SceneGraph};
use cdvis_shader::ShaderProgram;

use crate::backend::GpuBackend;
use crate::context::{queue, RenderContext};
use crate::resource::{Extent3d, TextureDesc, TextureHandle, TextureInit};
use crate::uniform::UniformBlock;
use crate::{RenderError, Result};

/// Whether the baked texture reflects the current inputs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BakeState {
    Clean,
    Dirty,
}

/// A texture together with the extent it was created at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct VolumeTexture {
    handle: TextureHandle,
    extent: Extent3d,
}

pub struct Volume {
    node: NodeId,
    params: VolumeParameters,
    source: Option<VolumeTexture>,
    baked: Option<VolumeTexture>,
    state: BakeState,
    seen_revision: Option<u64>,
    precompute_program: ShaderProgram,
    volume_program: ShaderProgram,
    bake_uniforms: UniformBlock,
    draw_uniforms: UniformBlock,
    bake_count: u64,
}

impl Volume {
    pub fn new(node: NodeId, context: &RenderContext) -> Self {
        Self::with_parameters(node, context, VolumeParameters::default())
    }

    pub fn with_parameters(node: NodeId, context: &RenderContext, params: VolumeParameters) -> Self {
        Self {
            node,
            params: params.sanitized(),
            source: None,
            baked: None,
            state: BakeState::Dirty,
            seen_revision: None,
            precompute_program: context.precompute_program.clone(),
            volume_program: context.volume_program.clone(),
            bake_uniforms: UniformBlock::new(),
            draw_uniforms: UniformBlock::new(),
            bake_count: 0,
        }
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parameters(&self) -> &VolumeParameters {
        &self.params
    }

    pub fn state(&self) -> BakeState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == BakeState::Dirty
    }

    /// Force a bake on the next precompute
    pub fn mark_dirty(&mut self) {
        self.state = BakeState::Dirty;
    }

    /// Number of bakes dispatched so far
    pub fn bake_count(&self) -> u64 {
        self.bake_count
    }

    pub fn source_texture(&self) -> Option<TextureHandle> {
        self.source.map(|t| t.handle)
    }

    pub fn source_extent(&self) -> Option<Extent3d> {
        self.source.map(|t| t.extent)
    }

    pub fn baked_texture(&self) -> Option<TextureHandle> {
        self.baked.map(|t| t.handle)
    }

    // Texture management

    /// Upload a new source volume of interleaved (intensity, aux) texels,
    /// releasing the previous one
    pub fn set_source(&mut self, backend: &mut dyn GpuBackend, extent: Extent3d, data: &[u16]) -> Result<()> {
        let expected = extent.texel_count() * 2;
        if data.len() != expected {
            return Err(RenderError::DataSize {
                expected,
                actual: data.len(),
            });
        }
        let handle = backend.create_texture(&TextureDesc::volume_source(extent), TextureInit::Data(data))?;
        if let Some(old) = self.source.replace(VolumeTexture { handle, extent }) {
            backend.destroy_texture(old.handle);
        }
        log::info!(
            "Volume source set: {}x{}x{}",
            extent.width,
            extent.height,
            extent.depth
        );
        self.mark_dirty();
        Ok(())
    }

    /// Overwrite the current source in place, e.g. after a mask was merged
    /// into the auxiliary channel
    pub fn write_source(&mut self, backend: &mut dyn GpuBackend, data: &[u16]) -> Result<()> {
        let Some(source) = self.source else {
            log::warn!("Volume has no source texture to write");
            return Ok(());
        };
        backend.write_texture(source.handle, data)?;
        self.mark_dirty();
        Ok(())
    }

    /// Drop the source texture. The baked texture is kept for reuse.
    pub fn clear_source(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(old) = self.source.take() {
            backend.destroy_texture(old.handle);
            self.mark_dirty();
        }
    }

    /// Release every GPU resource this volume owns
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(t) = self.source.take() {
            backend.destroy_texture(t.handle);
        }
        if let Some(t) = self.baked.take() {
            backend.destroy_texture(t.handle);
        }
        self.state = BakeState::Dirty;
    }

    // Parameters

    fn update(&mut self, f: impl FnOnce(&mut VolumeParameters)) {
        f(&mut self.params);
        self.params = self.params.clone().sanitized();
        self.mark_dirty();
    }

    /// Replace every parameter. Only marks dirty if a baked input changed.
    pub fn set_parameters(&mut self, params: VolumeParameters) {
        let params = params.sanitized();
        if params.affects_bake(&self.params) {
            self.mark_dirty();
        }
        self.params = params;
    }

    pub fn set_density(&mut self, density: f32) {
        self.update(|p| p.density = density);
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.update(|p| p.threshold = threshold);
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.update(|p| p.exposure = exposure);
    }

    pub fn set_light_density(&mut self, light_density: f32) {
        self.update(|p| p.light_density = light_density);
    }

    pub fn set_light_intensity(&mut self, intensity: f32) {
        self.update(|p| p.light_intensity = intensity);
    }

    pub fn set_light_ambient(&mut self, ambient: f32) {
        self.update(|p| p.light_ambient = ambient);
    }

    pub fn set_light_position(&mut self, position: Vec3) {
        self.update(|p| p.light_position = position);
    }

    pub fn set_light_direction(&mut self, direction: Vec3) {
        self.update(|p| p.light_direction = direction.normalize_or_zero());
    }

    pub fn set_light_angle(&mut self, angle: f32) {
        self.update(|p| p.light_angle = angle);
    }

    /// Clip plane in volume-local space
    pub fn set_plane(&mut self, point: Vec3, normal: Vec3) {
        self.update(|p| {
            p.plane_point = point;
            p.plane_normal = normal;
        });
    }

    pub fn set_mask_enabled(&mut self, mask: bool) {
        self.update(|p| p.mask = mask);
    }

    pub fn set_step_size(&mut self, step_size: f32) {
        self.params.step_size = step_size.max(VolumeParameters::MIN_STEP_SIZE);
    }

    pub fn set_display_sample_count(&mut self, enabled: bool) {
        self.params.display_sample_count = enabled;
    }

    /// Mark dirty if the node's world transform changed since the last check
    pub fn sync_transform(&mut self, graph: &mut SceneGraph) -> Result<()> {
        let revision = graph.revision(self.node)?;
        if self.seen_revision != Some(revision) {
            self.seen_revision = Some(revision);
            self.mark_dirty();
        }
        Ok(())
    }

    /// World-space bounds of the unit proxy cube
    pub fn bounds(&self, context: &RenderContext, graph: &mut SceneGraph) -> Result<Obb> {
        let world = graph.world(self.node)?;
        Ok(context
            .cube_bounds
            .to_world(&world.object_to_world, world.scale, world.rotation))
    }
}

impl crate::frame::Renderer for Volume {
    fn render_queue(&self) -> u32 {
        queue::VOLUME
    }

    fn draw(&mut self, frame: &mut crate::frame::Frame<'_>) -> Result<()> {
        self.draw_volume(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Command, RecordingBackend};
    use crate::testing::test_context;

    pub(super) fn setup() -> (RecordingBackend, RenderContext, SceneGraph, Volume) {
        let mut backend = RecordingBackend::new();
        let context = test_context(&mut backend);
        let mut graph = SceneGraph::new();
        let node = graph.create("volume");
        let volume = Volume::new(node, &context);
        backend.drain();
        (backend, context, graph, volume)
    }

    #[test]
    fn test_threshold_clamps() {
        let (_, _, _, mut volume) = setup();
        volume.set_threshold(-5.0);
        assert_eq!(volume.parameters().threshold, 0.0);
        volume.set_threshold(5.0);
        assert_eq!(volume.parameters().threshold, 1.0);
        volume.set_threshold(0.3);
        assert_eq!(volume.parameters().threshold, 0.3);
    }

    #[test]
    fn test_defaults() {
        let (_, _, _, volume) = setup();
        let p = volume.parameters();
        assert_eq!(p.step_size, 0.00135);
        assert_eq!(p.density, 0.5);
        assert_eq!(p.exposure, 1.5);
        assert!(!p.mask);
        assert!(volume.is_dirty());
    }

    #[test]
    fn test_set_source_replaces_and_marks_dirty() {
        let (mut backend, _, _, mut volume) = setup();
        let extent = Extent3d::new(2, 2, 2);
        volume.set_source(&mut backend, extent, &[7; 16]).unwrap();
        let first = volume.source_texture().unwrap();
        volume.state = BakeState::Clean;

        volume.set_source(&mut backend, extent, &[9; 16]).unwrap();
        assert!(volume.is_dirty());
        assert_ne!(volume.source_texture(), Some(first));
        assert_eq!(backend.count(|c| *c == Command::DestroyTexture(first)), 1);
        assert_eq!(backend.live_textures(), 1);
    }

    #[test]
    fn test_set_source_rejects_wrong_size() {
        let (mut backend, _, _, mut volume) = setup();
        let err = volume.set_source(&mut backend, Extent3d::new(2, 2, 2), &[0; 8]);
        assert!(matches!(err, Err(RenderError::DataSize { expected: 16, actual: 8 })));
        assert!(volume.source_texture().is_none());
    }

    #[test]
    fn test_setters_mark_dirty() {
        let (_, _, _, mut volume) = setup();
        let setters: [fn(&mut Volume); 8] = [
            |v| v.set_density(1.0),
            |v| v.set_exposure(2.0),
            |v| v.set_threshold(0.1),
            |v| v.set_light_intensity(5.0),
            |v| v.set_light_position(Vec3::ONE),
            |v| v.set_light_direction(Vec3::X),
            |v| v.set_plane(Vec3::ZERO, Vec3::Z),
            |v| v.set_mask_enabled(true),
        ];
        for set in setters {
            volume.state = BakeState::Clean;
            set(&mut volume);
            assert!(volume.is_dirty());
        }
    }

    #[test]
    fn test_step_size_and_sample_count_keep_bake() {
        let (_, _, _, mut volume) = setup();
        volume.state = BakeState::Clean;
        volume.set_step_size(0.002);
        volume.set_display_sample_count(true);
        assert!(!volume.is_dirty());
        assert_eq!(volume.parameters().step_size, 0.002);

        let mut params = volume.parameters().clone();
        params.step_size = 0.003;
        volume.set_parameters(params);
        assert!(!volume.is_dirty());
    }

    #[test]
    fn test_transform_change_marks_dirty() {
        let (_, _, mut graph, mut volume) = setup();
        volume.sync_transform(&mut graph).unwrap();
        volume.state = BakeState::Clean;

        volume.sync_transform(&mut graph).unwrap();
        assert!(!volume.is_dirty());

        graph.set_local_position(volume.node(), Vec3::X).unwrap();
        volume.sync_transform(&mut graph).unwrap();
        assert!(volume.is_dirty());
    }

    #[test]
    fn test_release_frees_textures() {
        let (mut backend, _, mut graph, mut volume) = setup();
        volume.set_source(&mut backend, Extent3d::new(1, 1, 1), &[0, 0]).unwrap();
        volume.precompute(&mut graph, &mut backend).unwrap();
        assert_eq!(backend.live_textures(), 2);

        volume.release(&mut backend);
        assert_eq!(backend.live_textures(), 0);
        assert!(volume.source_texture().is_none());
        assert!(volume.baked_texture().is_none());
    }
}
