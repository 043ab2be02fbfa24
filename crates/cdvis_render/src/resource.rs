//! GPU resource descriptions and handles
//!
//! Handles are opaque; only the backend that issued one can resolve it.

use cdvis_core::Handle;

/// Marker for texture handles
pub struct TextureTag;
/// Marker for mesh handles
pub struct MeshTag;

pub type TextureHandle = Handle<TextureTag>;
pub type MeshHandle = Handle<MeshTag>;

/// Texel formats the viewer uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Two 16-bit integer channels: intensity and auxiliary/mask
    Rg16Uint,
    /// Two 16-bit normalized channels, written by compute
    Rg16Unorm,
    Rgba8Unorm,
    Depth32Float,
}

impl TextureFormat {
    /// u16 values per texel for formats uploaded as u16 data
    pub fn u16_channels(&self) -> Option<usize> {
        match self {
            TextureFormat::Rg16Uint | TextureFormat::Rg16Unorm => Some(2),
            _ => None,
        }
    }
}

/// Texture dimension
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    D3,
}

/// Texture usage flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureUsage(pub u32);

impl TextureUsage {
    pub const COPY_DST: Self = Self(1 << 0);
    pub const SAMPLED: Self = Self(1 << 1);
    pub const STORAGE: Self = Self(1 << 2);
    pub const RENDER_ATTACHMENT: Self = Self(1 << 3);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for TextureUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Size of a texture in texels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3d {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Reciprocal of each dimension
    pub fn texel_size(&self) -> [f32; 3] {
        [
            1.0 / self.width.max(1) as f32,
            1.0 / self.height.max(1) as f32,
            1.0 / self.depth.max(1) as f32,
        ]
    }

    /// Workgroups needed to cover the extent with cubic tiles of `tile`
    pub fn workgroups(&self, tile: u32) -> [u32; 3] {
        [
            (self.width + tile - 1) / tile,
            (self.height + tile - 1) / tile,
            (self.depth + tile - 1) / tile,
        ]
    }
}

/// Texture descriptor
#[derive(Clone, Debug, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub extent: Extent3d,
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDesc {
    /// Raw volume data uploaded from the CPU
    pub fn volume_source(extent: Extent3d) -> Self {
        Self {
            label: "volume source".into(),
            extent,
            dimension: TextureDimension::D3,
            format: TextureFormat::Rg16Uint,
            usage: TextureUsage::SAMPLED | TextureUsage::COPY_DST,
        }
    }

    /// Precomputed volume, written by compute and sampled by the raymarch
    pub fn volume_baked(extent: Extent3d) -> Self {
        Self {
            label: "volume baked".into(),
            extent,
            dimension: TextureDimension::D3,
            format: TextureFormat::Rg16Unorm,
            usage: TextureUsage::SAMPLED | TextureUsage::STORAGE | TextureUsage::COPY_DST,
        }
    }
}

/// Initial contents of a new texture
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureInit<'a> {
    /// Contents undefined
    Uninitialized,
    /// Every channel of every texel set to one value
    Fill(u16),
    /// Interleaved channel data
    Data(&'a [u16]),
}

/// How a compute pass accesses a bound image
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Opaque,
    /// src-alpha, one-minus-src-alpha
    Alpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Back,
    Front,
}

/// Fixed-function state for one draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub blend: BlendMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull: CullMode,
}

impl PipelineState {
    pub const OPAQUE: Self = Self {
        blend: BlendMode::Opaque,
        depth_test: true,
        depth_write: true,
        cull: CullMode::Back,
    };

    /// Alpha-blended with depth testing and writing disabled
    pub const COMPOSITED: Self = Self {
        blend: BlendMode::Alpha,
        depth_test: false,
        depth_write: false,
        cull: CullMode::None,
    };
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::OPAQUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroups_round_up() {
        let e = Extent3d::new(512, 512, 97);
        assert_eq!(e.workgroups(8), [64, 64, 13]);
        assert_eq!(Extent3d::new(1, 8, 9).workgroups(8), [1, 1, 2]);
    }

    #[test]
    fn test_texel_size() {
        let e = Extent3d::new(2, 4, 8);
        assert_eq!(e.texel_size(), [0.5, 0.25, 0.125]);
        assert_eq!(e.texel_count(), 64);
    }

    #[test]
    fn test_usage_flags() {
        let usage = TextureDesc::volume_baked(Extent3d::new(1, 1, 1)).usage;
        assert!(usage.contains(TextureUsage::STORAGE));
        assert!(usage.contains(TextureUsage::SAMPLED | TextureUsage::STORAGE));
        assert!(!usage.contains(TextureUsage::RENDER_ATTACHMENT));
    }
}
