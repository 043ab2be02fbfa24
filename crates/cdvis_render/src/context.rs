//! Shared GPU objects for every renderer

use cdvis_math::Aabb;
use cdvis_shader::{ShaderLibrary, ShaderProgram};

use crate::backend::GpuBackend;
use crate::mesh::MeshData;
use crate::resource::MeshHandle;
use crate::Result;

/// Shader names the renderer expects a library to provide
pub mod shaders {
    pub const VOLUME: &str = "volume";
    pub const PRECOMPUTE: &str = "volume_precompute";
    pub const UNLIT: &str = "unlit";
}

/// Keywords of the volume shaders
pub mod keywords {
    pub const MASK: &str = "MASK";
    pub const LIGHT_POINT: &str = "LIGHT_POINT";
    pub const LIGHT_DIRECTIONAL: &str = "LIGHT_DIRECTIONAL";
    pub const SAMPLECOUNT: &str = "SAMPLECOUNT";
}

/// Render queue positions. Lower draws first.
pub mod queue {
    pub const OPAQUE: u32 = 100;
    pub const VOLUME: u32 = 1000;
    pub const OVERLAY: u32 = 1100;
}

/// Built once at startup and passed to every draw
pub struct RenderContext {
    pub cube: MeshHandle,
    pub cube_bounds: Aabb,
    pub wire_cube: MeshHandle,
    pub volume_program: ShaderProgram,
    pub precompute_program: ShaderProgram,
    pub unlit_program: ShaderProgram,
}

impl RenderContext {
    /// Upload the shared meshes and take keyword state for the shared
    /// programs. Fails if the library lacks one of [`shaders`].
    pub fn new(backend: &mut dyn GpuBackend, library: &ShaderLibrary) -> Result<Self> {
        let cube_data = MeshData::cube();
        let cube = backend.create_mesh(&cube_data)?;
        let wire_cube = backend.create_mesh(&MeshData::wire_cube())?;

        let context = Self {
            cube,
            cube_bounds: cube_data.bounds,
            wire_cube,
            volume_program: library.program(shaders::VOLUME)?,
            precompute_program: library.program(shaders::PRECOMPUTE)?,
            unlit_program: library.program(shaders::UNLIT)?,
        };
        log::info!("Render context ready on '{}' backend", backend.name());
        Ok(context)
    }
}
