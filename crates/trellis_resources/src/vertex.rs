//! Custom Vertex Buffers
//!
//! Model primitives carry their own interleaved vertex data in one of a
//! fixed set of layouts. Such a buffer is bound through the render-pass
//! extension rather than through the host's native vertex slots.

use trellis_core::{Result, TrellisError};

use crate::buffer::BufferRef;

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

const POSITION_NORMAL_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

const POSITION_NORMAL_UV_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

const POSITION_NORMAL_UV_SKIN_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Uint16x4,
    4 => Float32x4
];

/// Interleaved vertex layouts understood by model pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexType {
    Position,
    PositionNormal,
    PositionNormalUv,
    /// Position, normal, uv, four joint indices and four joint weights.
    PositionNormalUvSkin,
}

impl VertexType {
    #[must_use]
    pub fn attributes(self) -> &'static [wgpu::VertexAttribute] {
        match self {
            Self::Position => &POSITION_ATTRIBUTES,
            Self::PositionNormal => &POSITION_NORMAL_ATTRIBUTES,
            Self::PositionNormalUv => &POSITION_NORMAL_UV_ATTRIBUTES,
            Self::PositionNormalUvSkin => &POSITION_NORMAL_UV_SKIN_ATTRIBUTES,
        }
    }

    /// Byte size of one vertex.
    #[must_use]
    pub fn stride(self) -> u64 {
        self.attributes()
            .iter()
            .map(|attribute| attribute.offset + attribute.format.size())
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn layout(self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: self.attributes(),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::PositionNormal => "position_normal",
            Self::PositionNormalUv => "position_normal_uv",
            Self::PositionNormalUvSkin => "position_normal_uv_skin",
        }
    }
}

impl std::fmt::Display for VertexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A vertex buffer owned by a model primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBuffer {
    pub vertex_type: VertexType,
    pub vertices: u32,
    pub buffer: BufferRef,
}

impl VertexBuffer {
    /// Wraps interleaved vertex bytes. The byte length must be a whole number
    /// of vertices.
    pub fn new(vertex_type: VertexType, data: &[u8], label: Option<&str>) -> Result<Self> {
        let stride = vertex_type.stride();
        let len = data.len() as u64;
        if len % stride != 0 {
            return Err(TrellisError::LoadFailed(format!(
                "vertex data of {len} bytes is not a multiple of the \
                 {vertex_type} stride ({stride})"
            )));
        }
        let buffer = BufferRef::from_bytes(
            data,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            label,
        );
        Ok(Self {
            vertex_type,
            vertices: (len / stride) as u32,
            buffer,
        })
    }

    /// Checks that the backing buffer still holds exactly `vertices` vertices.
    pub fn check_consistent(&self) -> Result<()> {
        let expected = u64::from(self.vertices) * self.vertex_type.stride();
        let actual = self.buffer.size();
        if expected == actual {
            Ok(())
        } else {
            Err(TrellisError::LoadFailed(format!(
                "vertex buffer `{}` holds {actual} bytes, expected {expected}",
                self.buffer.label()
            )))
        }
    }
}

/// Index data of a primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuffer {
    pub format: wgpu::IndexFormat,
    pub count: u32,
    pub buffer: BufferRef,
}

impl IndexBuffer {
    #[must_use]
    pub fn from_u32(indices: &[u32], label: Option<&str>) -> Self {
        Self {
            format: wgpu::IndexFormat::Uint32,
            count: indices.len() as u32,
            buffer: BufferRef::new(
                indices,
                wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                label,
            ),
        }
    }

    #[must_use]
    pub fn from_u16(indices: &[u16], label: Option<&str>) -> Self {
        Self {
            format: wgpu::IndexFormat::Uint16,
            count: indices.len() as u32,
            buffer: BufferRef::new(
                indices,
                wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                label,
            ),
        }
    }

    /// Reads back the largest index value.
    #[must_use]
    pub fn max_index(&self) -> Option<u32> {
        let data = self.buffer.read_data();
        match self.format {
            wgpu::IndexFormat::Uint16 => data
                .chunks_exact(2)
                .map(|bytes| u32::from(u16::from_ne_bytes([bytes[0], bytes[1]])))
                .max(),
            wgpu::IndexFormat::Uint32 => data
                .chunks_exact(4)
                .map(|bytes| u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
                .max(),
        }
    }
}
