//! Headless backend that records every call
//!
//! Used to run the renderer without a GPU and to assert on exactly which
//! textures, dispatches, barriers and draws a frame produced.

use std::collections::HashMap;

use cdvis_core::HandleAllocator;
use cdvis_shader::ProgramKey;

use crate::backend::{ComputeDispatch, DrawCall, GpuBackend, ImageBinding, TextureBinding};
use crate::mesh::MeshData;
use crate::resource::{
    Extent3d, MeshHandle, MeshTag, PipelineState, TextureDesc, TextureHandle, TextureInit, TextureTag,
};
use crate::uniform::UniformBlock;
use crate::{RenderError, Result};

/// A recorded backend call
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    CreateTexture {
        texture: TextureHandle,
        desc: TextureDesc,
        fill: Option<u16>,
    },
    WriteTexture {
        texture: TextureHandle,
        len: usize,
    },
    DestroyTexture(TextureHandle),
    CreateMesh {
        mesh: MeshHandle,
        index_count: u32,
    },
    Dispatch {
        program: ProgramKey,
        uniforms: UniformBlock,
        images: Vec<ImageBinding>,
        workgroups: [u32; 3],
    },
    Barrier,
    ResolveDepth(TextureHandle),
    Draw {
        program: ProgramKey,
        mesh: MeshHandle,
        index_count: u32,
        uniforms: UniformBlock,
        textures: Vec<TextureBinding>,
        state: PipelineState,
    },
}

#[derive(Default)]
pub struct RecordingBackend {
    textures: HandleAllocator<TextureTag>,
    meshes: HandleAllocator<MeshTag>,
    extents: HashMap<TextureHandle, Extent3d>,
    texels: HashMap<TextureHandle, Vec<u16>>,
    index_counts: HashMap<MeshHandle, u32>,
    depth: Option<TextureHandle>,
    commands: Vec<Command>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Take the recorded commands, leaving resources alive
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Contents of a texture created or written with explicit data
    pub fn texels(&self, texture: TextureHandle) -> Option<&[u16]> {
        self.texels.get(&texture).map(Vec::as_slice)
    }

    pub fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    fn check_texture(&self, texture: TextureHandle) -> Result<()> {
        if self.textures.is_valid(texture) {
            Ok(())
        } else {
            Err(RenderError::InvalidTexture(texture))
        }
    }
}

impl GpuBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn create_texture(&mut self, desc: &TextureDesc, init: TextureInit<'_>) -> Result<TextureHandle> {
        let channels = desc.format.u16_channels().unwrap_or(1);
        let expected = desc.extent.texel_count() * channels;
        if let TextureInit::Data(data) = init {
            if data.len() != expected {
                return Err(RenderError::DataSize {
                    expected,
                    actual: data.len(),
                });
            }
        }

        let texture = self.textures.allocate();
        self.extents.insert(texture, desc.extent);
        let fill = match init {
            TextureInit::Fill(v) => {
                self.texels.insert(texture, vec![v; expected]);
                Some(v)
            }
            TextureInit::Data(data) => {
                self.texels.insert(texture, data.to_vec());
                None
            }
            TextureInit::Uninitialized => None,
        };
        self.commands.push(Command::CreateTexture {
            texture,
            desc: desc.clone(),
            fill,
        });
        Ok(texture)
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u16]) -> Result<()> {
        self.check_texture(texture)?;
        if let Some(existing) = self.texels.get(&texture) {
            if existing.len() != data.len() {
                return Err(RenderError::DataSize {
                    expected: existing.len(),
                    actual: data.len(),
                });
            }
        }
        self.texels.insert(texture, data.to_vec());
        self.commands.push(Command::WriteTexture {
            texture,
            len: data.len(),
        });
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.free(texture) {
            self.extents.remove(&texture);
            self.texels.remove(&texture);
            self.commands.push(Command::DestroyTexture(texture));
        }
    }

    fn texture_extent(&self, texture: TextureHandle) -> Option<Extent3d> {
        if !self.textures.is_valid(texture) {
            return None;
        }
        self.extents.get(&texture).copied()
    }

    fn create_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle> {
        let handle = self.meshes.allocate();
        let index_count = mesh.indices.len() as u32;
        self.index_counts.insert(handle, index_count);
        self.commands.push(Command::CreateMesh {
            mesh: handle,
            index_count,
        });
        Ok(handle)
    }

    fn dispatch_compute(&mut self, dispatch: &ComputeDispatch<'_>) -> Result<()> {
        for image in dispatch.images {
            self.check_texture(image.texture)?;
        }
        self.commands.push(Command::Dispatch {
            program: dispatch.program.clone(),
            uniforms: dispatch.uniforms.clone(),
            images: dispatch.images.to_vec(),
            workgroups: dispatch.workgroups,
        });
        Ok(())
    }

    fn memory_barrier(&mut self) {
        self.commands.push(Command::Barrier);
    }

    fn resolve_depth(&mut self) -> Result<TextureHandle> {
        let depth = match self.depth {
            Some(d) => d,
            None => {
                let d = self.textures.allocate();
                self.extents.insert(d, Extent3d::new(1, 1, 1));
                self.depth = Some(d);
                log::debug!("Recording backend created depth target {:?}", d);
                d
            }
        };
        self.commands.push(Command::ResolveDepth(depth));
        Ok(depth)
    }

    fn draw(&mut self, draw: &DrawCall<'_>) -> Result<()> {
        let index_count = *self
            .index_counts
            .get(&draw.mesh)
            .ok_or(RenderError::InvalidMesh(draw.mesh))?;
        for binding in draw.textures {
            if let Some(t) = binding.texture {
                self.check_texture(t)?;
            }
        }
        self.commands.push(Command::Draw {
            program: draw.program.clone(),
            mesh: draw.mesh,
            index_count,
            uniforms: draw.uniforms.clone(),
            textures: draw.textures.to_vec(),
            state: draw.state,
        });
        Ok(())
    }
}
