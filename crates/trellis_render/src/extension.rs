//! Render Pass Extension
//!
//! Per-pass state that lets model rendering share a host render pass with
//! the host's own drawing.
//!
//! # Vertex Paths
//!
//! A pass gets its vertices either from the host's native slots or from one
//! custom [`VertexBuffer`], never both. Whichever path is used first wins for
//! the rest of the pass:
//!
//! | Already bound        | Attempt              | Result                          |
//! |----------------------|----------------------|---------------------------------|
//! | native slot 0        | custom buffer        | [`BindingConflict::CustomOverNative`] |
//! | custom buffer        | native (any slot)    | [`BindingConflict::NativeOverCustom`] |
//! | custom buffer        | custom buffer        | replaced                        |
//!
//! # Lifecycle
//!
//! `Open -> Closed`. Once closed, every mutation and every draw fails with
//! [`TrellisError::ClosedPass`].

use rustc_hash::FxHashMap;
use trellis_core::{BindingConflict, Result, TrellisError};
use trellis_resources::{BufferSlice, VertexBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Open,
    Closed,
}

/// Binding state attached one-to-one to a host render pass.
#[derive(Debug, Default)]
pub struct RenderPassExtension {
    state: PassState,
    native_slot_zero: bool,
    custom_vertex_buffer: Option<VertexBuffer>,
    storage_buffers: FxHashMap<String, BufferSlice>,
}

impl RenderPassExtension {
    /// Fresh state for a newly constructed pass: open, nothing bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PassState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == PassState::Closed
    }

    pub fn check_open(&self) -> Result<()> {
        match self.state {
            PassState::Open => Ok(()),
            PassState::Closed => Err(TrellisError::ClosedPass),
        }
    }

    /// Hook for the host's native "set vertex buffer at slot".
    ///
    /// Must run before the host records the binding.
    pub fn on_native_vertex_buffer(&mut self, slot: u32) -> Result<()> {
        self.check_open()?;
        if self.custom_vertex_buffer.is_some() {
            let conflict = BindingConflict::NativeOverCustom;
            log::error!("{conflict} (slot {slot})");
            return Err(conflict.into());
        }
        if slot == 0 {
            self.native_slot_zero = true;
        }
        Ok(())
    }

    /// Hook for the host's pass teardown. Idempotent.
    pub fn on_close(&mut self) {
        self.state = PassState::Closed;
    }

    /// Installs a custom vertex buffer as the pass's vertex source.
    pub fn set_vertex_buffer(&mut self, buffer: VertexBuffer) -> Result<()> {
        self.check_open()?;
        if self.native_slot_zero {
            let conflict = BindingConflict::CustomOverNative;
            log::error!("{conflict}");
            return Err(conflict.into());
        }
        self.custom_vertex_buffer = Some(buffer);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn vertex_buffer(&self) -> Option<&VertexBuffer> {
        self.custom_vertex_buffer.as_ref()
    }

    /// Binds `buffer` under `name`, replacing any earlier binding of that name.
    pub fn set_storage_buffer(
        &mut self,
        name: impl Into<String>,
        buffer: BufferSlice,
    ) -> Result<()> {
        self.check_open()?;
        self.storage_buffers.insert(name.into(), buffer);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn storage_buffers(&self) -> &FxHashMap<String, BufferSlice> {
        &self.storage_buffers
    }
}

/// Model-rendering operations on a host render pass.
pub trait RenderPassExt {
    /// Installs a custom vertex buffer. Fails if native slot 0 is bound.
    fn set_custom_vertex_buffer(&mut self, buffer: VertexBuffer) -> Result<()>;

    /// Binds a named storage buffer for the following draws.
    fn set_storage_buffer(&mut self, name: &str, buffer: BufferSlice) -> Result<()>;

    fn storage_buffers(&self) -> &FxHashMap<String, BufferSlice>;

    /// Draws `count` elements per instance for `instance_count` instances,
    /// indices starting at `first_index`, vertices offset by `base_vertex`.
    fn draw(
        &mut self,
        base_vertex: i32,
        first_index: u32,
        count: u32,
        instance_count: u32,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_resources::{BufferRef, VertexType};

    fn vertex_buffer() -> VertexBuffer {
        VertexBuffer::new(VertexType::Position, &[0u8; 36], Some("Triangle")).unwrap()
    }

    #[test]
    fn custom_then_native_conflicts() {
        let mut extension = RenderPassExtension::new();
        extension.set_vertex_buffer(vertex_buffer()).unwrap();
        assert!(matches!(
            extension.on_native_vertex_buffer(0),
            Err(TrellisError::ConflictingBinding(
                BindingConflict::NativeOverCustom
            ))
        ));
        assert!(extension.on_native_vertex_buffer(3).is_err());
        // Replacing the custom buffer is fine.
        extension.set_vertex_buffer(vertex_buffer()).unwrap();
    }

    #[test]
    fn native_then_custom_conflicts() {
        let mut extension = RenderPassExtension::new();
        extension.on_native_vertex_buffer(0).unwrap();
        assert!(matches!(
            extension.set_vertex_buffer(vertex_buffer()),
            Err(TrellisError::ConflictingBinding(
                BindingConflict::CustomOverNative
            ))
        ));
        assert!(extension.vertex_buffer().is_none());
    }

    #[test]
    fn native_on_other_slot_leaves_custom_available() {
        let mut extension = RenderPassExtension::new();
        extension.on_native_vertex_buffer(1).unwrap();
        extension.set_vertex_buffer(vertex_buffer()).unwrap();
    }

    #[test]
    fn storage_buffers_are_last_write_wins() {
        let mut extension = RenderPassExtension::new();
        let first = BufferRef::new_with_capacity(16, wgpu::BufferUsages::STORAGE, None);
        let second = BufferRef::new_with_capacity(16, wgpu::BufferUsages::STORAGE, None);

        extension.set_storage_buffer("Data", first.as_slice()).unwrap();
        extension.set_storage_buffer("Data", second.as_slice()).unwrap();
        assert_eq!(extension.storage_buffers().len(), 1);
        assert_eq!(extension.storage_buffers()["Data"].buffer_id(), second.id());
    }

    #[test]
    fn closed_pass_rejects_everything() {
        let mut extension = RenderPassExtension::new();
        extension.on_close();
        extension.on_close();
        assert!(extension.is_closed());
        assert!(matches!(
            extension.set_vertex_buffer(vertex_buffer()),
            Err(TrellisError::ClosedPass)
        ));
        assert!(matches!(
            extension.on_native_vertex_buffer(0),
            Err(TrellisError::ClosedPass)
        ));
        let buffer = BufferRef::new_with_capacity(16, wgpu::BufferUsages::STORAGE, None);
        assert!(extension.set_storage_buffer("Data", buffer.as_slice()).is_err());
        assert!(extension.storage_buffers().is_empty());
    }
}
