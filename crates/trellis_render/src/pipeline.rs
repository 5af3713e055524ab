use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};
use trellis_core::{Result, TrellisError};
use trellis_resources::{BufferSlice, VertexBuffer, VertexType};

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(0);

/// What a model pipeline reads beyond the host's own bindings: an optional
/// custom vertex layout and a set of named storage buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSnippet {
    vertex_type: Option<VertexType>,
    storage_buffers: FxHashSet<String>,
}

impl PipelineSnippet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_vertex_type(mut self, vertex_type: VertexType) -> Self {
        self.vertex_type = Some(vertex_type);
        self
    }

    #[must_use]
    pub fn with_storage_buffer(mut self, name: impl Into<String>) -> Self {
        self.storage_buffers.insert(name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn vertex_type(&self) -> Option<VertexType> {
        self.vertex_type
    }

    #[inline]
    #[must_use]
    pub fn storage_buffers(&self) -> &FxHashSet<String> {
        &self.storage_buffers
    }

    /// Checks the bindings a draw is about to use.
    ///
    /// Every declared storage buffer must be bound. A custom vertex buffer,
    /// if one is installed, must have the declared vertex type.
    pub fn validate(
        &self,
        custom_vertex_buffer: Option<&VertexBuffer>,
        storage_buffers: &FxHashMap<String, BufferSlice>,
    ) -> Result<()> {
        // Report the lexically first missing name so errors are stable.
        let mut missing: Vec<&String> = self
            .storage_buffers
            .iter()
            .filter(|name| !storage_buffers.contains_key(name.as_str()))
            .collect();
        missing.sort();
        if let Some(name) = missing.first() {
            return Err(TrellisError::MissingStorageBuffer((*name).clone()));
        }

        if let (Some(expected), Some(buffer)) = (self.vertex_type, custom_vertex_buffer)
            && buffer.vertex_type != expected
        {
            return Err(TrellisError::VertexTypeMismatch {
                expected: expected.to_string(),
                found: buffer.vertex_type.to_string(),
            });
        }
        Ok(())
    }
}

/// A host pipeline as far as the pass needs to know it.
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    id: u64,
    label: String,
    snippet: PipelineSnippet,
}

impl RenderPipeline {
    #[must_use]
    pub fn new(label: impl Into<String>, snippet: PipelineSnippet) -> Self {
        Self {
            id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            snippet,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn snippet(&self) -> &PipelineSnippet {
        &self.snippet
    }
}
