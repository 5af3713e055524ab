//! Render layer of Trellis: the host render-pass model, the per-pass
//! binding extension and the model renderer built on it.

pub mod extension;
pub mod model_renderer;
pub mod pass;
pub mod pipeline;

pub use extension::{PassState, RenderPassExt, RenderPassExtension};
pub use model_renderer::{MODEL_MATRICES, ModelRenderer, PRIMITIVE_NODE};
pub use pass::{
    CommandRecorder, DrawCommand, DrawSubmitter, HostRenderPass, IndexBinding, VertexSource,
};
pub use pipeline::{PipelineSnippet, RenderPipeline};
