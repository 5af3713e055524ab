#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Trellis: reference-counted model scenes and instances, composable node
//! transforms, and a render-pass extension that arbitrates vertex and
//! storage buffer bindings for model draws.
//!
//! The member crates are re-exported as modules; the common types are also
//! available at the crate root.

pub use glam;

pub use trellis_assets as assets;
pub use trellis_core as core;
pub use trellis_render as render;
pub use trellis_resources as resources;
pub use trellis_scene as scene;

pub use trellis_assets::{
    LoadHandle, LoadResult, Model, ModelFileLoader, ModelFileLoaders, ModelInstanceManager,
    ModelLoader, SceneReconstructor, SharedModelContext,
};
pub use trellis_core::{RefCount, Result, TrellisError, TrellisSettings};
pub use trellis_render::{
    CommandRecorder, DrawCommand, DrawSubmitter, HostRenderPass, ModelRenderer, RenderPassExt,
    RenderPassExtension, RenderPipeline,
};
pub use trellis_resources::{BufferRef, BufferSlice, IndexBuffer, VertexBuffer, VertexType};
pub use trellis_scene::{
    DecomposedTransform, ModelInstance, NodeDescriptor, RenderScene, TransformHierarchy,
    TransformId,
};
