//! Shader uniform values
//!
//! Uniforms are set by name into a [`UniformBlock`]. A program's
//! [`UniformLayout`] lists its fields in declaration order and packs a
//! block into the byte layout WGSL expects for a uniform buffer struct.

use std::collections::BTreeMap;

use cdvis_math::{Mat4, Vec2, Vec3, Vec4};

use crate::resource::TextureHandle;
use crate::{RenderError, Result};

/// One uniform value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Texture(TextureHandle),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Texture(_) => UniformKind::Texture,
        }
    }
}

macro_rules! impl_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for UniformValue {
            fn from(v: $ty) -> Self {
                UniformValue::$variant(v)
            }
        }
    };
}

impl_from!(i32, Int);
impl_from!(f32, Float);
impl_from!(Vec2, Vec2);
impl_from!(Vec3, Vec3);
impl_from!(Vec4, Vec4);
impl_from!(Mat4, Mat4);
impl_from!(TextureHandle, Texture);

/// Type tag of a uniform
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Texture,
}

impl UniformKind {
    /// (alignment, size) in a WGSL uniform buffer
    pub fn align_size(&self) -> (usize, usize) {
        match self {
            UniformKind::Int | UniformKind::Float => (4, 4),
            UniformKind::Vec2 => (8, 8),
            UniformKind::Vec3 => (16, 12),
            UniformKind::Vec4 => (16, 16),
            UniformKind::Mat4 => (16, 64),
            // bound separately, takes no buffer space
            UniformKind::Texture => (1, 0),
        }
    }
}

/// Uniform values keyed by name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformBlock {
    values: BTreeMap<String, UniformValue>,
}

impl UniformBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        let value = value.into();
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<UniformValue> {
        self.values.remove(name)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every value of `other` over this block
    pub fn merge(&mut self, other: &UniformBlock) {
        for (name, value) in other.iter() {
            self.set(name, *value);
        }
    }

    /// Texture-valued uniforms, in name order
    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureHandle)> {
        self.values.iter().filter_map(|(k, v)| match v {
            UniformValue::Texture(t) => Some((k.as_str(), *t)),
            _ => None,
        })
    }
}

/// Ordered field list of a uniform struct
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformLayout {
    fields: Vec<(String, UniformKind, usize)>,
    size: usize,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, placing it at its WGSL alignment
    pub fn field(mut self, name: &str, kind: UniformKind) -> Self {
        let (align, size) = kind.align_size();
        let offset = round_up(self.size, align);
        self.fields.push((name.to_string(), kind, offset));
        self.size = offset + size;
        self
    }

    /// Byte size of the packed struct, rounded to 16
    pub fn size(&self) -> usize {
        round_up(self.size.max(16), 16)
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().find(|(n, _, _)| n == name).map(|(_, _, o)| *o)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, UniformKind)> {
        self.fields.iter().map(|(n, k, _)| (n.as_str(), *k))
    }

    /// Pack a block. Missing fields stay zero; a value of the wrong kind is
    /// an error.
    pub fn pack(&self, block: &UniformBlock) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; self.size()];
        for (name, kind, offset) in &self.fields {
            let Some(value) = block.get(name) else {
                log::trace!("Uniform '{}' not set, zero-filled", name);
                continue;
            };
            if value.kind() != *kind {
                return Err(RenderError::UniformKind {
                    name: name.clone(),
                    expected: *kind,
                    found: value.kind(),
                });
            }
            let dst = &mut bytes[*offset..];
            match value {
                UniformValue::Int(v) => dst[..4].copy_from_slice(&v.to_ne_bytes()),
                UniformValue::Float(v) => dst[..4].copy_from_slice(&v.to_ne_bytes()),
                UniformValue::Vec2(v) => dst[..8].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
                UniformValue::Vec3(v) => dst[..12].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
                UniformValue::Vec4(v) => dst[..16].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
                UniformValue::Mat4(m) => dst[..64].copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
                UniformValue::Texture(_) => {}
            }
        }
        Ok(bytes)
    }
}

fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}
