//! CPU-side descriptors of the GPU resources a model owns: data buffers and
//! slices, custom vertex layouts, index buffers, materials and primitives.

pub mod buffer;
pub mod material;
pub mod primitive;
pub mod vertex;

pub use buffer::{BufferRef, BufferSlice, DataBuffer};
pub use material::{AlphaMode, RenderMaterial};
pub use primitive::RenderPrimitive;
pub use vertex::{IndexBuffer, VertexBuffer, VertexType};
