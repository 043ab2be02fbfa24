//! wgpu implementation of the render backend
//!
//! Every draw and dispatch is recorded into its own encoder and submitted
//! immediately, so submission order is call order. Within one frame:
//!
//! ```text
//! begin_frame(view) ──► draws with depth ──► resolve_depth ──► draws without depth ──► end_frame
//!        │                                        ▲
//!        └── first pass clears color and depth ───┘ (or resolve/end_frame does)
//! ```
//!
//! Shader modules, bind group layouts and pipelines are created on first
//! use and cached by program key.

use std::collections::HashMap;
use std::sync::Arc;

use cdvis_core::HandleAllocator;
use cdvis_render::{
    interface, BlendMode, ComputeDispatch, CullMode, DrawCall, Extent3d, GpuBackend, MeshData,
    MeshHandle, MeshTag, PipelineState, ProgramInterface, RenderError, Result, SlotKind,
    TextureDesc, TextureDimension, TextureFormat, TextureHandle, TextureInit, TextureTag,
    TextureUsage, Topology, Vertex,
};
use cdvis_shader::{ProgramKey, ShaderLibrary};
use half::f16;
use wgpu::util::DeviceExt;

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.25,
    g: 0.25,
    b: 0.25,
    a: 1.0,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const BAKED_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    extent: Extent3d,
    format: TextureFormat,
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    topology: Topology,
}

/// Layouts derived from a shader's resource interface
struct ProgramLayout {
    interface: ProgramInterface,
    uniforms: wgpu::BindGroupLayout,
    textures: Option<wgpu::BindGroupLayout>,
    pipeline: wgpu::PipelineLayout,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramKey,
    state: PipelineState,
    topology: Topology,
    depth: bool,
}

/// Bound when a draw leaves a unit empty
struct DefaultTextures {
    float3d: GpuTexture,
    uint3d: GpuTexture,
    depth2d: GpuTexture,
}

/// The surface texture being drawn this frame
struct FrameTarget {
    view: wgpu::TextureView,
    clear_pending: bool,
    depth_resolved: bool,
    draws: u32,
    dispatches: u32,
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    library: Arc<ShaderLibrary>,
    color_format: wgpu::TextureFormat,

    texture_handles: HandleAllocator<TextureTag>,
    textures: HashMap<TextureHandle, GpuTexture>,
    mesh_handles: HandleAllocator<MeshTag>,
    meshes: HashMap<MeshHandle, GpuMesh>,

    modules: HashMap<ProgramKey, wgpu::ShaderModule>,
    layouts: HashMap<String, ProgramLayout>,
    render_pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    compute_pipelines: HashMap<ProgramKey, wgpu::ComputePipeline>,

    sampler: wgpu::Sampler,
    defaults: DefaultTextures,
    depth: TextureHandle,
    target: Option<FrameTarget>,
}

impl WgpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        library: Arc<ShaderLibrary>,
        color_format: wgpu::TextureFormat,
        size: (u32, u32),
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("volume_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let one = Extent3d::new(1, 1, 1);
        let defaults = DefaultTextures {
            float3d: raw_texture(
                &device,
                "default_float3d",
                one,
                TextureDimension::D3,
                TextureFormat::Rg16Unorm,
                TextureUsage::SAMPLED | TextureUsage::STORAGE,
            ),
            uint3d: raw_texture(
                &device,
                "default_uint3d",
                one,
                TextureDimension::D3,
                TextureFormat::Rg16Uint,
                TextureUsage::SAMPLED,
            ),
            depth2d: depth_texture(&device, (1, 1)),
        };

        let mut backend = Self {
            texture_handles: HandleAllocator::new(),
            textures: HashMap::new(),
            mesh_handles: HandleAllocator::new(),
            meshes: HashMap::new(),
            modules: HashMap::new(),
            layouts: HashMap::new(),
            render_pipelines: HashMap::new(),
            compute_pipelines: HashMap::new(),
            sampler,
            defaults,
            depth: TextureHandle::default(),
            target: None,
            device,
            queue,
            library,
            color_format,
        };

        // the 1x1 default depth reads as the far plane
        backend.clear_depth_view(&backend.defaults.depth2d.view);

        let depth = depth_texture(&backend.device, size);
        backend.depth = backend.texture_handles.allocate();
        backend.textures.insert(backend.depth, depth);

        log::info!(
            "wgpu backend ready: {:?} color, {}x{} depth",
            color_format,
            size.0,
            size.1
        );
        backend
    }

    /// Recreate the depth target at the new surface size. The handle
    /// returned by `resolve_depth` stays the same.
    pub fn resize(&mut self, size: (u32, u32)) {
        if size.0 == 0 || size.1 == 0 {
            return;
        }
        let depth = depth_texture(&self.device, size);
        if let Some(old) = self.textures.insert(self.depth, depth) {
            old.texture.destroy();
        }
        log::debug!("Depth target resized to {}x{}", size.0, size.1);
    }

    /// Start drawing into `view`. The first pass clears it.
    pub fn begin_frame(&mut self, view: wgpu::TextureView) {
        if self.target.is_some() {
            log::warn!("begin_frame called twice without end_frame");
        }
        self.target = Some(FrameTarget {
            view,
            clear_pending: true,
            depth_resolved: false,
            draws: 0,
            dispatches: 0,
        });
    }

    /// Finish the frame. A frame with no draws still gets cleared.
    pub fn end_frame(&mut self) {
        self.flush_clear();
        if let Some(target) = self.target.take() {
            log::trace!(
                "Frame finished: {} draws, {} dispatches",
                target.draws,
                target.dispatches
            );
        }
    }

    pub fn pipeline_count(&self) -> usize {
        self.render_pipelines.len() + self.compute_pipelines.len()
    }

    fn texture(&self, handle: TextureHandle) -> Result<&GpuTexture> {
        self.textures
            .get(&handle)
            .ok_or(RenderError::InvalidTexture(handle))
    }

    fn upload(&self, texture: &GpuTexture, data: &[u16]) -> Result<()> {
        let channels = texture.format.u16_channels().ok_or_else(|| {
            RenderError::Backend(format!("{:?} cannot be written from u16 data", texture.format))
        })?;
        let expected = texture.extent.texel_count() * channels;
        if data.len() != expected {
            return Err(RenderError::DataSize {
                expected,
                actual: data.len(),
            });
        }

        let bytes = texel_bytes(texture.format, data);
        let extent = texture.extent;
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(extent.width * bytes_per_texel(texture.format)),
                rows_per_image: Some(extent.height),
            },
            wgpu_extent(extent),
        );
        Ok(())
    }

    fn clear_depth_view(&self, view: &wgpu::TextureView) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("depth_clear"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("depth_clear"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Run the pending clear of color and depth with no draws
    fn flush_clear(&mut self) {
        let Some(target) = self.target.as_ref() else {
            return;
        };
        if !target.clear_pending {
            return;
        }
        let Some(depth) = self.textures.get(&self.depth) else {
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_clear"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame_clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(target) = self.target.as_mut() {
            target.clear_pending = false;
        }
    }

    fn ensure_module(&mut self, key: &ProgramKey) -> Result<()> {
        if self.modules.contains_key(key) {
            return Ok(());
        }
        let variant = self.library.resolve(key)?;
        let label = key.to_string();
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(variant.source.as_str().into()),
        });
        log::debug!("Created shader module {}", label);
        self.modules.insert(key.clone(), module);
        Ok(())
    }

    fn ensure_layout(&mut self, shader: &str) -> Result<()> {
        if self.layouts.contains_key(shader) {
            return Ok(());
        }
        let interface = interface(shader)
            .ok_or_else(|| RenderError::Backend(format!("no resource interface for shader '{}'", shader)))?;
        let layout = program_layout(&self.device, shader, interface);
        self.layouts.insert(shader.to_string(), layout);
        Ok(())
    }

    fn ensure_render_pipeline(&mut self, key: &PipelineKey) -> Result<()> {
        if self.render_pipelines.contains_key(key) {
            return Ok(());
        }
        self.ensure_module(&key.program)?;
        self.ensure_layout(&key.program.shader)?;

        let layout = &self.layouts[&key.program.shader];
        let module = &self.modules[&key.program];
        let (Some(vs_entry), Some(fs_entry)) =
            (layout.interface.vertex_entry, layout.interface.fragment_entry)
        else {
            return Err(RenderError::Backend(format!(
                "'{}' has no vertex and fragment entry points",
                key.program.shader
            )));
        };

        let label = format!("{} {:?}", key.program, key.state);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&layout.pipeline),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: vs_entry,
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: fs_entry,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.color_format,
                        blend: Some(blend_state(key.state.blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: primitive_topology(key.topology),
                    // meshes are wound clockwise seen from outside
                    front_face: wgpu::FrontFace::Cw,
                    cull_mode: cull_face(key.state.cull),
                    ..Default::default()
                },
                depth_stencil: key.depth.then(|| depth_stencil_state(key.state)),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        log::debug!("Created render pipeline {}", label);
        self.render_pipelines.insert(key.clone(), pipeline);
        Ok(())
    }

    fn ensure_compute_pipeline(&mut self, key: &ProgramKey) -> Result<()> {
        if self.compute_pipelines.contains_key(key) {
            return Ok(());
        }
        self.ensure_module(key)?;
        self.ensure_layout(&key.shader)?;

        let layout = &self.layouts[&key.shader];
        let entry_point = layout.interface.compute_entry.ok_or_else(|| {
            RenderError::Backend(format!("'{}' has no compute entry point", key.shader))
        })?;
        let label = key.to_string();
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&label),
                layout: Some(&layout.pipeline),
                module: &self.modules[key],
                entry_point,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });
        log::debug!("Created compute pipeline {}", label);
        self.compute_pipelines.insert(key.clone(), pipeline);
        Ok(())
    }

    fn uniform_bind_group(
        &self,
        layout: &ProgramLayout,
        uniforms: &cdvis_render::UniformBlock,
    ) -> Result<wgpu::BindGroup> {
        let bytes = layout.interface.uniforms.pack(uniforms)?;
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniforms"),
                contents: &bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniforms"),
            layout: &layout.uniforms,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        }))
    }

    /// Group 1 for a program, units resolved through `lookup`
    fn texture_bind_group(
        &self,
        layout: &ProgramLayout,
        lookup: impl Fn(u32) -> Option<TextureHandle>,
    ) -> Result<Option<wgpu::BindGroup>> {
        let Some(group_layout) = &layout.textures else {
            return Ok(None);
        };

        let mut views = Vec::with_capacity(layout.interface.slots.len());
        for slot in &layout.interface.slots {
            let view = match lookup(slot.unit) {
                Some(handle) => &self.texture(handle)?.view,
                None => &self.default_texture(slot.kind).view,
            };
            views.push((slot, view));
        }

        let mut entries = Vec::with_capacity(views.len() * 2);
        for (slot, view) in &views {
            entries.push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
            if slot.has_sampler() {
                entries.push(wgpu::BindGroupEntry {
                    binding: slot.binding + 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                });
            }
        }

        Ok(Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("textures"),
            layout: group_layout,
            entries: &entries,
        })))
    }

    fn default_texture(&self, kind: SlotKind) -> &GpuTexture {
        match kind {
            SlotKind::FilteredTexture3d | SlotKind::StorageTexture3d => &self.defaults.float3d,
            SlotKind::UintTexture3d => &self.defaults.uint3d,
            SlotKind::Depth2d => &self.defaults.depth2d,
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn create_texture(&mut self, desc: &TextureDesc, init: TextureInit<'_>) -> Result<TextureHandle> {
        let mut usage = desc.usage;
        if init != TextureInit::Uninitialized {
            usage = usage | TextureUsage::COPY_DST;
        }
        let texture = raw_texture(
            &self.device,
            &desc.label,
            desc.extent,
            desc.dimension,
            desc.format,
            usage,
        );

        match init {
            TextureInit::Uninitialized => {}
            TextureInit::Fill(value) => {
                let channels = desc.format.u16_channels().unwrap_or(1);
                self.upload(&texture, &vec![value; desc.extent.texel_count() * channels])?;
            }
            TextureInit::Data(data) => self.upload(&texture, data)?,
        }

        let handle = self.texture_handles.allocate();
        log::debug!(
            "Created {:?} texture '{}' {}x{}x{} as {:?}",
            desc.format,
            desc.label,
            desc.extent.width,
            desc.extent.height,
            desc.extent.depth,
            handle
        );
        self.textures.insert(handle, texture);
        Ok(handle)
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u16]) -> Result<()> {
        let gpu = self.texture(texture)?;
        self.upload(gpu, data)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if texture == self.depth {
            log::warn!("Refusing to destroy the depth target");
            return;
        }
        if let Some(gpu) = self.textures.remove(&texture) {
            gpu.texture.destroy();
            self.texture_handles.free(texture);
        }
    }

    fn texture_extent(&self, texture: TextureHandle) -> Option<Extent3d> {
        self.textures.get(&texture).map(|t| t.extent)
    }

    fn create_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle> {
        if mesh.indices.is_empty() {
            return Err(RenderError::Backend("mesh has no indices".into()));
        }
        let vertices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertices"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let indices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let handle = self.mesh_handles.allocate();
        self.meshes.insert(
            handle,
            GpuMesh {
                vertices,
                indices,
                index_count: mesh.index_count(),
                topology: mesh.topology,
            },
        );
        Ok(handle)
    }

    fn dispatch_compute(&mut self, dispatch: &ComputeDispatch<'_>) -> Result<()> {
        self.ensure_compute_pipeline(dispatch.program)?;

        let layout = &self.layouts[&dispatch.program.shader];
        let uniforms = self.uniform_bind_group(layout, dispatch.uniforms)?;
        let textures = self.texture_bind_group(layout, |unit| {
            dispatch
                .images
                .iter()
                .find(|i| i.unit == unit)
                .map(|i| i.texture)
        })?;
        let pipeline = &self.compute_pipelines[dispatch.program];

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("compute"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("compute"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &uniforms, &[]);
            if let Some(textures) = &textures {
                pass.set_bind_group(1, textures, &[]);
            }
            let [x, y, z] = dispatch.workgroups;
            pass.dispatch_workgroups(x, y, z);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(target) = self.target.as_mut() {
            target.dispatches += 1;
        }
        Ok(())
    }

    fn memory_barrier(&mut self) {
        // queue submissions are ordered and wgpu tracks the storage-to-sampled
        // transition itself
        log::trace!("memory barrier");
    }

    fn resolve_depth(&mut self) -> Result<TextureHandle> {
        if self.target.is_none() {
            return Err(RenderError::NoDepthTarget);
        }
        self.flush_clear();
        if let Some(target) = self.target.as_mut() {
            target.depth_resolved = true;
        }
        Ok(self.depth)
    }

    fn draw(&mut self, draw: &DrawCall<'_>) -> Result<()> {
        let (depth_attached, clear) = match &self.target {
            Some(target) => (!target.depth_resolved, target.clear_pending),
            None => return Err(RenderError::Backend("draw outside of a frame".into())),
        };
        let mesh = self
            .meshes
            .get(&draw.mesh)
            .ok_or(RenderError::InvalidMesh(draw.mesh))?;
        let key = PipelineKey {
            program: draw.program.clone(),
            state: draw.state,
            topology: mesh.topology,
            depth: depth_attached,
        };
        self.ensure_render_pipeline(&key)?;

        let layout = &self.layouts[&key.program.shader];
        let uniforms = self.uniform_bind_group(layout, draw.uniforms)?;
        let textures = self.texture_bind_group(layout, |unit| {
            draw.textures
                .iter()
                .find(|t| t.unit == unit)
                .and_then(|t| t.texture)
        })?;
        let pipeline = &self.render_pipelines[&key];
        let mesh = &self.meshes[&draw.mesh];
        let depth = self.texture(self.depth)?;
        let Some(target) = self.target.as_ref() else {
            return Err(RenderError::Backend("draw outside of a frame".into()));
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("draw"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: if clear {
                            wgpu::LoadOp::Clear(CLEAR_COLOR)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: depth_attached.then(|| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: if clear {
                                wgpu::LoadOp::Clear(1.0)
                            } else {
                                wgpu::LoadOp::Load
                            },
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &uniforms, &[]);
            if let Some(textures) = &textures {
                pass.set_bind_group(1, textures, &[]);
            }
            pass.set_vertex_buffer(0, mesh.vertices.slice(..));
            pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(target) = self.target.as_mut() {
            target.clear_pending = false;
            target.draws += 1;
        }
        Ok(())
    }
}

fn raw_texture(
    device: &wgpu::Device,
    label: &str,
    extent: Extent3d,
    dimension: TextureDimension,
    format: TextureFormat,
    usage: TextureUsage,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu_extent(extent),
        mip_level_count: 1,
        sample_count: 1,
        dimension: match dimension {
            TextureDimension::D2 => wgpu::TextureDimension::D2,
            TextureDimension::D3 => wgpu::TextureDimension::D3,
        },
        format: wgpu_format(format),
        usage: wgpu_usage(usage),
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        extent,
        format,
    }
}

fn depth_texture(device: &wgpu::Device, size: (u32, u32)) -> GpuTexture {
    raw_texture(
        device,
        "scene_depth",
        Extent3d::new(size.0.max(1), size.1.max(1), 1),
        TextureDimension::D2,
        TextureFormat::Depth32Float,
        TextureUsage::SAMPLED | TextureUsage::RENDER_ATTACHMENT,
    )
}

fn program_layout(device: &wgpu::Device, shader: &str, interface: ProgramInterface) -> ProgramLayout {
    let visibility = if interface.is_compute() {
        wgpu::ShaderStages::COMPUTE
    } else {
        wgpu::ShaderStages::VERTEX_FRAGMENT
    };

    let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{} uniforms", shader)),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });

    let textures = (!interface.slots.is_empty()).then(|| {
        let mut entries = Vec::new();
        for slot in &interface.slots {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot.binding,
                visibility,
                ty: slot_binding_type(slot.kind),
                count: None,
            });
            if slot.has_sampler() {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding: slot.binding + 1,
                    visibility,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                });
            }
        }
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} textures", shader)),
            entries: &entries,
        })
    });

    let pipeline = {
        let mut groups = vec![&uniforms];
        if let Some(textures) = &textures {
            groups.push(textures);
        }
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(shader),
            bind_group_layouts: &groups,
            push_constant_ranges: &[],
        })
    };

    ProgramLayout {
        interface,
        uniforms,
        textures,
        pipeline,
    }
}

fn slot_binding_type(kind: SlotKind) -> wgpu::BindingType {
    match kind {
        SlotKind::FilteredTexture3d => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D3,
            multisampled: false,
        },
        SlotKind::Depth2d => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        SlotKind::UintTexture3d => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Uint,
            view_dimension: wgpu::TextureViewDimension::D3,
            multisampled: false,
        },
        SlotKind::StorageTexture3d => wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: BAKED_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D3,
        },
    }
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Opaque => wgpu::BlendState::REPLACE,
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
    }
}

fn cull_face(mode: CullMode) -> Option<wgpu::Face> {
    match mode {
        CullMode::None => None,
        CullMode::Back => Some(wgpu::Face::Back),
        CullMode::Front => Some(wgpu::Face::Front),
    }
}

fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
    }
}

fn depth_stencil_state(state: PipelineState) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: state.depth_write,
        depth_compare: if state.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Normalized 16-bit textures are stored as half floats so compute can
/// write them as storage images
fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rg16Uint => wgpu::TextureFormat::Rg16Uint,
        TextureFormat::Rg16Unorm => BAKED_FORMAT,
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Depth32Float => DEPTH_FORMAT,
    }
}

fn wgpu_usage(usage: TextureUsage) -> wgpu::TextureUsages {
    let mut out = wgpu::TextureUsages::empty();
    for (ours, theirs) in [
        (TextureUsage::COPY_DST, wgpu::TextureUsages::COPY_DST),
        (TextureUsage::SAMPLED, wgpu::TextureUsages::TEXTURE_BINDING),
        (TextureUsage::STORAGE, wgpu::TextureUsages::STORAGE_BINDING),
        (TextureUsage::RENDER_ATTACHMENT, wgpu::TextureUsages::RENDER_ATTACHMENT),
    ] {
        if usage.contains(ours) {
            out |= theirs;
        }
    }
    out
}

fn wgpu_extent(extent: Extent3d) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: extent.depth,
    }
}

/// Bytes per texel as stored on the GPU
fn bytes_per_texel(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Rg16Uint | TextureFormat::Rgba8Unorm | TextureFormat::Depth32Float => 4,
        TextureFormat::Rg16Unorm => 8,
    }
}

/// Interleaved u16 channel data in the layout of the GPU format
fn texel_bytes(format: TextureFormat, data: &[u16]) -> Vec<u8> {
    match format {
        TextureFormat::Rg16Unorm => {
            let one = f16::ONE.to_bits();
            let halves: Vec<u16> = data
                .chunks_exact(2)
                .flat_map(|rg| [unorm_to_half(rg[0]), unorm_to_half(rg[1]), 0, one])
                .collect();
            bytemuck::cast_slice(&halves).to_vec()
        }
        _ => bytemuck::cast_slice(data).to_vec(),
    }
}

fn unorm_to_half(value: u16) -> u16 {
    f16::from_f32(f32::from(value) / 65535.0).to_bits()
}
