//! Shaders shipped with the renderer and the resource interface of each
//!
//! A backend builds its bind group layouts from a [`ProgramInterface`]:
//! group 0 holds the uniform buffer, group 1 the textures and images.

use cdvis_shader::ShaderLibrary;

use crate::context::shaders;
use crate::uniform::{UniformKind, UniformLayout};
use crate::Result;

pub const VOLUME_WGSL: &str = include_str!("../shaders/volume.wgsl");
pub const PRECOMPUTE_WGSL: &str = include_str!("../shaders/volume_precompute.wgsl");
pub const UNLIT_WGSL: &str = include_str!("../shaders/unlit.wgsl");

/// What a binding slot holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    /// Filterable float 3D texture with a sampler at `binding + 1`
    FilteredTexture3d,
    /// Depth texture read with `textureLoad`
    Depth2d,
    /// Unsigned 3D texture read with `textureLoad`
    UintTexture3d,
    /// Write-only float storage texture
    StorageTexture3d,
}

/// One texture unit and where it lands in group 1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureSlot {
    pub unit: u32,
    pub binding: u32,
    pub kind: SlotKind,
}

impl TextureSlot {
    pub const fn new(unit: u32, binding: u32, kind: SlotKind) -> Self {
        Self { unit, binding, kind }
    }

    pub fn has_sampler(&self) -> bool {
        self.kind == SlotKind::FilteredTexture3d
    }
}

#[derive(Clone, Debug)]
pub struct ProgramInterface {
    pub uniforms: UniformLayout,
    pub slots: Vec<TextureSlot>,
    pub vertex_entry: Option<&'static str>,
    pub fragment_entry: Option<&'static str>,
    pub compute_entry: Option<&'static str>,
}

impl ProgramInterface {
    pub fn slot(&self, unit: u32) -> Option<&TextureSlot> {
        self.slots.iter().find(|s| s.unit == unit)
    }

    pub fn is_compute(&self) -> bool {
        self.compute_entry.is_some()
    }
}

/// Interface of a built-in shader by name
pub fn interface(shader: &str) -> Option<ProgramInterface> {
    match shader {
        shaders::VOLUME => Some(volume_interface()),
        shaders::PRECOMPUTE => Some(precompute_interface()),
        shaders::UNLIT => Some(unlit_interface()),
        _ => None,
    }
}

fn volume_interface() -> ProgramInterface {
    ProgramInterface {
        uniforms: UniformLayout::new()
            .field("MVP", UniformKind::Mat4)
            .field("ViewToObject", UniformKind::Mat4)
            .field("InverseProjection", UniformKind::Mat4)
            .field("ObjectToWorld", UniformKind::Mat4)
            .field("CameraPosition", UniformKind::Vec3)
            .field("StepSize", UniformKind::Float)
            .field("PlanePoint", UniformKind::Vec3)
            .field("PlaneNormal", UniformKind::Vec3),
        slots: vec![
            TextureSlot::new(0, 0, SlotKind::FilteredTexture3d),
            TextureSlot::new(1, 2, SlotKind::Depth2d),
        ],
        vertex_entry: Some("vs_main"),
        fragment_entry: Some("fs_main"),
        compute_entry: None,
    }
}

fn precompute_interface() -> ProgramInterface {
    ProgramInterface {
        uniforms: UniformLayout::new()
            .field("WorldScale", UniformKind::Vec3)
            .field("Exposure", UniformKind::Float)
            .field("TexelSize", UniformKind::Vec3)
            .field("Density", UniformKind::Float)
            .field("LightPosition", UniformKind::Vec3)
            .field("Threshold", UniformKind::Float)
            .field("LightDirection", UniformKind::Vec3)
            .field("LightDensity", UniformKind::Float)
            .field("LightAngle", UniformKind::Float)
            .field("LightAmbient", UniformKind::Float)
            .field("LightIntensity", UniformKind::Float),
        slots: vec![
            TextureSlot::new(0, 0, SlotKind::UintTexture3d),
            TextureSlot::new(1, 1, SlotKind::StorageTexture3d),
        ],
        vertex_entry: None,
        fragment_entry: None,
        compute_entry: Some("cs_main"),
    }
}

fn unlit_interface() -> ProgramInterface {
    ProgramInterface {
        uniforms: UniformLayout::new()
            .field("ObjectToWorld", UniformKind::Mat4)
            .field("ViewProjection", UniformKind::Mat4)
            .field("Color", UniformKind::Vec4),
        slots: Vec::new(),
        vertex_entry: Some("vs_main"),
        fragment_entry: Some("fs_main"),
        compute_entry: None,
    }
}

/// Compile every built-in shader with all of its variants
pub fn builtin_library() -> Result<ShaderLibrary> {
    let mut library = ShaderLibrary::new();
    library.load(shaders::VOLUME, VOLUME_WGSL)?;
    library.load(shaders::PRECOMPUTE, PRECOMPUTE_WGSL)?;
    library.load(shaders::UNLIT, UNLIT_WGSL)?;
    log::info!("Loaded {} built-in shaders", library.len());
    Ok(library)
}
