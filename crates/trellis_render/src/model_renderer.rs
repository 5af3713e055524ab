use trellis_core::Result;
use trellis_resources::VertexType;
use trellis_scene::ModelInstance;

use crate::extension::RenderPassExt;
use crate::pass::HostRenderPass;
use crate::pipeline::PipelineSnippet;

/// Storage buffer name of an instance's world matrices.
pub const MODEL_MATRICES: &str = "ModelMatrices";

/// Storage buffer name of the per-primitive node index.
pub const PRIMITIVE_NODE: &str = "PrimitiveNode";

/// Draws model instances through the render-pass extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelRenderer;

impl ModelRenderer {
    /// The snippet a model pipeline for `vertex_type` declares.
    #[must_use]
    pub fn pipeline_snippet(vertex_type: VertexType) -> PipelineSnippet {
        PipelineSnippet::new()
            .with_vertex_type(vertex_type)
            .with_storage_buffer(MODEL_MATRICES)
            .with_storage_buffer(PRIMITIVE_NODE)
    }

    /// Issues one draw per primitive of the instance's scene, each covering
    /// `instance_count` instances. Returns the number of draws.
    ///
    /// Fails with [`TrellisError::StaleRenderData`](trellis_core::TrellisError::StaleRenderData)
    /// if the instance was edited after its last
    /// [`update_render_data`](ModelInstance::update_render_data).
    pub fn render(
        &self,
        pass: &mut HostRenderPass<'_>,
        instance: &ModelInstance,
        instance_count: u32,
    ) -> Result<usize> {
        let matrices = instance.matrices_buffer()?;
        let resources = instance.scene().resources()?;

        pass.set_storage_buffer(MODEL_MATRICES, matrices.as_slice())?;

        for scene_primitive in &resources.primitives {
            let primitive = &scene_primitive.primitive;
            pass.set_storage_buffer(PRIMITIVE_NODE, scene_primitive.node_buffer.as_slice())?;
            pass.set_custom_vertex_buffer(primitive.vertex_buffer.clone())?;
            match &primitive.index_buffer {
                Some(indices) => pass.set_index_buffer(indices.buffer.as_slice(), indices.format)?,
                None => pass.unset_index_buffer()?,
            }
            pass.draw(0, 0, primitive.draw_count(), instance_count)?;
        }

        Ok(resources.primitives.len())
    }
}
