//! Error Types
//!
//! This module defines the error types used throughout Trellis.
//!
//! # Overview
//!
//! The main error type [`TrellisError`] covers:
//! - Structural defects in a scene's node tree
//! - Render-pass binding conflicts and use of closed passes
//! - Reference-count misuse (underflow, use after disposal)
//! - Model loading failures
//!
//! Everything except the loading failures is a programmer error: it is
//! reported synchronously at the call site that broke the contract and is
//! never retried. Load failures arrive through the load handle instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trellis_core::errors::{TrellisError, Result};
//!
//! fn bind() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Structural defect found while building a transform hierarchy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyDefect {
    #[error("hierarchy has no nodes")]
    Empty,

    #[error("node index {0} appears more than once")]
    DuplicateIndex(usize),

    #[error("node indices are not dense: expected {expected}, found {found}")]
    NonDenseIndex { expected: usize, found: usize },

    #[error("node {node} refers to missing parent {parent}")]
    MissingParent { node: usize, parent: usize },

    #[error("node {node} refers to missing child {child}")]
    MissingChild { node: usize, child: usize },

    #[error("node {node} is reachable through a cycle")]
    Cycle { node: usize },

    #[error("node {child} is claimed by more than one parent")]
    SharedChild { child: usize },

    #[error("hierarchy has more than one root: {first} and {second}")]
    MultipleRoots { first: usize, second: usize },

    #[error("root index {root} is out of range ({len} nodes)")]
    RootOutOfRange { root: usize, len: usize },

    #[error("declared root {root} is a child of node {parent}")]
    RootHasParent { root: usize, parent: usize },
}

/// Which vertex-buffer path was refused on a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingConflict {
    /// A custom vertex buffer was requested while native slot 0 is occupied.
    CustomOverNative,
    /// A native vertex buffer was requested while a custom one is installed.
    NativeOverCustom,
}

impl std::fmt::Display for BindingConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CustomOverNative => f.write_str(
                "can't set a custom vertex buffer on a render pass \
                 already having a native vertex buffer",
            ),
            Self::NativeOverCustom => f.write_str(
                "can't set a native vertex buffer on a render pass \
                 already having a custom vertex buffer",
            ),
        }
    }
}

/// The main error type for Trellis.
#[derive(Error, Debug)]
pub enum TrellisError {
    // ========================================================================
    // Hierarchy & Transform Errors
    // ========================================================================
    /// The node tree of a scene is structurally invalid.
    #[error("Malformed hierarchy: {0}")]
    MalformedHierarchy(#[from] HierarchyDefect),

    /// A node index outside the scene's hierarchy.
    #[error("Invalid node index {index} (hierarchy has {len} nodes)")]
    InvalidNodeIndex { index: usize, len: usize },

    /// A relative transform edit named a base layer that is not an earlier,
    /// already established layer of the same node.
    #[error("Relative layer {layer} of node {node} has no established base layer {base}")]
    MissingBaseTransform { node: usize, layer: u32, base: u32 },

    /// Render data was consumed after a transform edit without recomputation.
    #[error("Render data is stale; call update_render_data before drawing")]
    StaleRenderData,

    // ========================================================================
    // Render Pass Errors
    // ========================================================================
    /// Two mutually exclusive vertex-buffer paths on one pass.
    #[error("Conflicting binding: {0}")]
    ConflictingBinding(BindingConflict),

    /// Mutation or draw on a pass that has been closed.
    #[error("Can't use a closed render pass")]
    ClosedPass,

    /// The bound pipeline reads a storage buffer nobody bound.
    #[error("Pipeline requires storage buffer `{0}`, but it is not bound")]
    MissingStorageBuffer(String),

    /// The custom vertex buffer layout does not match the pipeline.
    #[error("Vertex type mismatch: pipeline expects {expected}, buffer provides {found}")]
    VertexTypeMismatch { expected: String, found: String },

    /// A native vertex slot beyond the host's slot count.
    #[error("Vertex buffer slot {0} is out of range")]
    InvalidVertexSlot(u32),

    /// A draw whose element range does not fit in `u32`.
    #[error("Invalid draw range: {count} elements from {first_index}")]
    InvalidDrawRange { first_index: u32, count: u32 },

    // ========================================================================
    // Reference Counting Errors
    // ========================================================================
    /// A decrement that would take the count below zero.
    #[error("Reference count underflow on {resource}")]
    ReferenceCountUnderflow { resource: &'static str },

    /// Access to, or acquisition of, an already disposed resource.
    #[error("{resource} is already closed")]
    ResourceClosed { resource: &'static str },

    /// Access to a resource whose count was never raised above zero.
    #[error("{resource} is used before any reference was acquired")]
    ResourceNotAcquired { resource: &'static str },

    /// A required external resource is absent.
    #[error("Missing resource: {0}")]
    MissingResource(String),

    // ========================================================================
    // Loading Errors
    // ========================================================================
    /// No registered loader recognised the file.
    #[error("No model loader for {0}")]
    NoModelLoader(PathBuf),

    /// The file was recognised but holds no model.
    #[error("File {0} doesn't contain a model")]
    NoModel(PathBuf),

    /// The loader failed while parsing or reconstructing a model.
    #[error("Model load failed: {0}")]
    LoadFailed(String),

    /// The load completion channel closed without delivering a result.
    #[error("Model load was cancelled before completion")]
    LoadCancelled,

    /// Task join error (when the blocking load task panics).
    #[error("Task join error: {0}")]
    TaskJoinError(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Settings could not be parsed.
    #[error("Settings parse error: {0}")]
    SettingsError(#[from] serde_json::Error),
}

impl From<BindingConflict> for TrellisError {
    fn from(conflict: BindingConflict) -> Self {
        TrellisError::ConflictingBinding(conflict)
    }
}

/// Alias for `Result<T, TrellisError>`.
pub type Result<T> = std::result::Result<T, TrellisError>;
