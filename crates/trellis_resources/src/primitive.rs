use std::sync::Arc;

use trellis_core::{Result, TrellisError};

use crate::material::RenderMaterial;
use crate::vertex::{IndexBuffer, VertexBuffer};

/// One drawable piece of a mesh: vertices, optional indices and a material.
#[derive(Debug, Clone)]
pub struct RenderPrimitive {
    pub vertex_buffer: VertexBuffer,
    pub index_buffer: Option<IndexBuffer>,
    pub material: Arc<RenderMaterial>,
}

impl RenderPrimitive {
    /// Number of elements one instance of this primitive draws.
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        self.index_buffer
            .as_ref()
            .map_or(self.vertex_buffer.vertices, |indices| indices.count)
    }

    /// Validates buffer sizes and index ranges.
    pub fn check_consistent(&self) -> Result<()> {
        self.vertex_buffer.check_consistent()?;
        if let Some(indices) = &self.index_buffer
            && let Some(max) = indices.max_index()
            && max >= self.vertex_buffer.vertices
        {
            return Err(TrellisError::LoadFailed(format!(
                "index {max} is out of range for {} vertices",
                self.vertex_buffer.vertices
            )));
        }
        Ok(())
    }
}
