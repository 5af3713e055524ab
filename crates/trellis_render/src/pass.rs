//! Host render pass
//!
//! A state-tracking render pass owned by the host renderer. It records what
//! is bound and hands finished draws to a [`DrawSubmitter`]. The attached
//! [`RenderPassExtension`] sees every native vertex binding and the pass
//! teardown, which is what keeps the two vertex paths exclusive.

use std::ops::Range;

use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};
use trellis_core::settings::DEFAULT_MAX_VERTEX_SLOTS;
use trellis_core::{Result, TrellisError, TrellisSettings};
use trellis_resources::{BufferSlice, VertexBuffer};

use crate::extension::{RenderPassExt, RenderPassExtension};
use crate::pipeline::RenderPipeline;

/// Where a draw takes its vertices from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexSource {
    None,
    /// Host-bound slices, by slot.
    Native(SmallVec<[(u32, BufferSlice); 2]>),
    Custom(VertexBuffer),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBinding {
    pub slice: BufferSlice,
    pub format: wgpu::IndexFormat,
}

/// One draw as handed to the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    pub pass: String,
    pub pipeline: Option<String>,
    pub vertex_source: VertexSource,
    pub index_buffer: Option<IndexBinding>,
    /// Storage bindings, sorted by name.
    pub storage_buffers: Vec<(String, BufferSlice)>,
    /// Indices when an index buffer is bound, vertices otherwise.
    pub elements: Range<u32>,
    pub base_vertex: i32,
    pub instances: Range<u32>,
}

impl DrawCommand {
    #[must_use]
    pub fn storage_buffer(&self, name: &str) -> Option<&BufferSlice> {
        self.storage_buffers
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, slice)| slice)
    }

    #[inline]
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.instances.end - self.instances.start
    }
}

/// Receives draw commands from render passes.
pub trait DrawSubmitter {
    fn submit(&mut self, command: DrawCommand) -> Result<()>;
}

/// A submitter that keeps every command, in order.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl DrawSubmitter for CommandRecorder {
    fn submit(&mut self, command: DrawCommand) -> Result<()> {
        log::trace!(
            "Draw on `{}`: {:?} x {:?}",
            command.pass,
            command.elements,
            command.instances
        );
        self.commands.push(command);
        Ok(())
    }
}

pub struct HostRenderPass<'a> {
    label: String,
    submitter: &'a mut dyn DrawSubmitter,
    pipeline: Option<&'a RenderPipeline>,
    vertex_buffers: SmallVec<[Option<BufferSlice>; DEFAULT_MAX_VERTEX_SLOTS as usize]>,
    index_buffer: Option<IndexBinding>,
    extension: RenderPassExtension,
}

impl<'a> HostRenderPass<'a> {
    #[must_use]
    pub fn new(label: impl Into<String>, submitter: &'a mut dyn DrawSubmitter) -> Self {
        Self::with_vertex_slots(label, submitter, DEFAULT_MAX_VERTEX_SLOTS)
    }

    /// A pass exposing `settings.max_vertex_slots` native slots.
    #[must_use]
    pub fn from_settings(
        label: impl Into<String>,
        submitter: &'a mut dyn DrawSubmitter,
        settings: &TrellisSettings,
    ) -> Self {
        Self::with_vertex_slots(label, submitter, settings.max_vertex_slots)
    }

    #[must_use]
    pub fn with_vertex_slots(
        label: impl Into<String>,
        submitter: &'a mut dyn DrawSubmitter,
        slots: u32,
    ) -> Self {
        Self {
            label: label.into(),
            submitter,
            pipeline: None,
            vertex_buffers: smallvec![None; slots as usize],
            index_buffer: None,
            extension: RenderPassExtension::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn extension(&self) -> &RenderPassExtension {
        &self.extension
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.extension.is_closed()
    }

    pub fn set_pipeline(&mut self, pipeline: &'a RenderPipeline) -> Result<()> {
        self.extension.check_open()?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// Native vertex binding. Rejected once a custom vertex buffer is set.
    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferSlice) -> Result<()> {
        let index = slot as usize;
        if index >= self.vertex_buffers.len() {
            return Err(TrellisError::InvalidVertexSlot(slot));
        }
        self.extension.on_native_vertex_buffer(slot)?;
        self.vertex_buffers[index] = Some(buffer);
        Ok(())
    }

    pub fn set_index_buffer(
        &mut self,
        buffer: BufferSlice,
        format: wgpu::IndexFormat,
    ) -> Result<()> {
        self.extension.check_open()?;
        self.index_buffer = Some(IndexBinding {
            slice: buffer,
            format,
        });
        Ok(())
    }

    /// Switches following draws to non-indexed drawing.
    pub fn unset_index_buffer(&mut self) -> Result<()> {
        self.extension.check_open()?;
        self.index_buffer = None;
        Ok(())
    }

    /// Host draw path. Also checked against the pipeline's requirements.
    pub fn draw_indexed(
        &mut self,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) -> Result<()> {
        self.submit(indices, base_vertex, instances)
    }

    /// Ends the pass. Later calls fail with [`TrellisError::ClosedPass`].
    pub fn close(&mut self) {
        if !self.extension.is_closed() {
            log::trace!("Render pass `{}` closed", self.label);
        }
        self.extension.on_close();
    }

    fn vertex_source(&self) -> VertexSource {
        if let Some(buffer) = self.extension.vertex_buffer() {
            return VertexSource::Custom(buffer.clone());
        }
        let native: SmallVec<[(u32, BufferSlice); 2]> = self
            .vertex_buffers
            .iter()
            .enumerate()
            .filter_map(|(slot, buffer)| buffer.clone().map(|buffer| (slot as u32, buffer)))
            .collect();
        if native.is_empty() {
            VertexSource::None
        } else {
            VertexSource::Native(native)
        }
    }

    fn submit(
        &mut self,
        elements: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) -> Result<()> {
        self.extension.check_open()?;
        if let Some(pipeline) = self.pipeline {
            pipeline
                .snippet()
                .validate(self.extension.vertex_buffer(), self.extension.storage_buffers())?;
        }

        let mut storage_buffers: Vec<(String, BufferSlice)> = self
            .extension
            .storage_buffers()
            .iter()
            .map(|(name, slice)| (name.clone(), slice.clone()))
            .collect();
        storage_buffers.sort_by(|a, b| a.0.cmp(&b.0));

        let command = DrawCommand {
            pass: self.label.clone(),
            pipeline: self.pipeline.map(|pipeline| pipeline.label().to_string()),
            vertex_source: self.vertex_source(),
            index_buffer: self.index_buffer.clone(),
            storage_buffers,
            elements,
            base_vertex,
            instances,
        };
        self.submitter.submit(command)
    }
}

impl RenderPassExt for HostRenderPass<'_> {
    fn set_custom_vertex_buffer(&mut self, buffer: VertexBuffer) -> Result<()> {
        self.extension.set_vertex_buffer(buffer)
    }

    fn set_storage_buffer(&mut self, name: &str, buffer: BufferSlice) -> Result<()> {
        self.extension.set_storage_buffer(name, buffer)
    }

    fn storage_buffers(&self) -> &FxHashMap<String, BufferSlice> {
        self.extension.storage_buffers()
    }

    fn draw(
        &mut self,
        base_vertex: i32,
        first_index: u32,
        count: u32,
        instance_count: u32,
    ) -> Result<()> {
        self.extension.check_open()?;
        let end = first_index
            .checked_add(count)
            .ok_or(TrellisError::InvalidDrawRange { first_index, count })?;
        self.submit(first_index..end, base_vertex, 0..instance_count)
    }
}

impl std::fmt::Debug for HostRenderPass<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRenderPass")
            .field("label", &self.label)
            .field("pipeline", &self.pipeline.map(RenderPipeline::label))
            .field("index_buffer", &self.index_buffer)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}
