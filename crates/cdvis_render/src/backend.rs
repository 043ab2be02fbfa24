//! The seam between rendering logic and a graphics API

use cdvis_shader::ProgramKey;

use crate::mesh::MeshData;
use crate::resource::{
    Extent3d, ImageAccess, MeshHandle, PipelineState, TextureDesc, TextureHandle, TextureInit,
};
use crate::uniform::UniformBlock;
use crate::Result;

/// A storage image bound to a compute unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageBinding {
    pub unit: u32,
    pub texture: TextureHandle,
    pub access: ImageAccess,
}

/// A sampled texture bound to a draw unit. `None` leaves the unit on the
/// backend's default texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub unit: u32,
    pub texture: Option<TextureHandle>,
}

/// One compute dispatch
#[derive(Clone, Copy, Debug)]
pub struct ComputeDispatch<'a> {
    pub program: &'a ProgramKey,
    pub uniforms: &'a UniformBlock,
    pub images: &'a [ImageBinding],
    pub workgroups: [u32; 3],
}

/// One indexed draw
#[derive(Clone, Copy, Debug)]
pub struct DrawCall<'a> {
    pub program: &'a ProgramKey,
    pub mesh: MeshHandle,
    pub uniforms: &'a UniformBlock,
    pub textures: &'a [TextureBinding],
    pub state: PipelineState,
}

/// Operations the renderer needs from a graphics API.
///
/// All calls happen on the render thread in frame order. Compute work is
/// asynchronous; [`GpuBackend::memory_barrier`] orders it before any later
/// sampling.
pub trait GpuBackend {
    fn name(&self) -> &str;

    fn create_texture(&mut self, desc: &TextureDesc, init: TextureInit<'_>) -> Result<TextureHandle>;

    /// Replace the full contents of a texture with interleaved u16 data
    fn write_texture(&mut self, texture: TextureHandle, data: &[u16]) -> Result<()>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    fn texture_extent(&self, texture: TextureHandle) -> Option<Extent3d>;

    fn create_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle>;

    fn dispatch_compute(&mut self, dispatch: &ComputeDispatch<'_>) -> Result<()>;

    /// Make every previous compute write visible to later reads
    fn memory_barrier(&mut self);

    /// Make the opaque depth written so far available for sampling and
    /// return it. Draws issued afterwards cannot depth-test against it.
    fn resolve_depth(&mut self) -> Result<TextureHandle>;

    fn draw(&mut self, draw: &DrawCall<'_>) -> Result<()>;
}
