//! # cdvis_render - Volume Rendering
//!
//! Backend-agnostic rendering for the viewer. Everything here talks to the
//! GPU through the [`GpuBackend`] trait and opaque handles, so the same
//! code drives the wgpu backend in the runtime and the headless
//! [`RecordingBackend`] used in tests.
//!
//! ## Frame order
//!
//! ```text
//! opaque renderers (queue < VOLUME) ──► resolve depth ──► Volume::draw
//!                                                           │
//!                                          bake if dirty ◄──┘
//! ```
//!
//! Shared GPU objects (proxy cube, programs) live in one [`RenderContext`]
//! created at startup and passed to every draw.

pub mod backend;
pub mod builtin;
pub mod context;
pub mod frame;
pub mod mesh;
pub mod mesh_renderer;
pub mod recording;
pub mod resource;
pub mod uniform;
pub mod volume;

pub use backend::*;
pub use builtin::{builtin_library, interface, ProgramInterface, SlotKind, TextureSlot};
pub use context::*;
pub use frame::*;
pub use mesh::*;
pub use mesh_renderer::*;
pub use recording::*;
pub use resource::*;
pub use uniform::*;
pub use volume::*;

use thiserror::Error;

/// Errors from the render layer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown texture {0:?}")]
    InvalidTexture(TextureHandle),

    #[error("Unknown mesh {0:?}")]
    InvalidMesh(MeshHandle),

    #[error("Texture data size mismatch: expected {expected} texels, got {actual}")]
    DataSize { expected: usize, actual: usize },

    #[error("Uniform '{name}' expected {expected:?}, found {found:?}")]
    UniformKind {
        name: String,
        expected: UniformKind,
        found: UniformKind,
    },

    #[error("No depth target to resolve")]
    NoDepthTarget,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Shader(#[from] cdvis_shader::ShaderError),

    #[error("Scene node error: {0}")]
    Node(#[from] cdvis_core::HandleError),
}

pub type Result<T> = std::result::Result<T, RenderError>;

pub mod prelude {
    pub use crate::backend::{ComputeDispatch, DrawCall, GpuBackend};
    pub use crate::context::RenderContext;
    pub use crate::frame::{draw_sorted, Frame, Renderer};
    pub use crate::mesh_renderer::MeshRenderer;
    pub use crate::resource::{Extent3d, MeshHandle, TextureDesc, TextureFormat, TextureHandle};
    pub use crate::uniform::{UniformBlock, UniformValue};
    pub use crate::volume::{Volume, VolumeParameters};
    pub use crate::{RenderError, Result};
}
