use trellis_resources::{RenderMaterial, VertexType};
use trellis_scene::DecomposedTransform;

/// A node of a parsed model. Children are referenced by index.
#[derive(Debug, Clone, Default)]
pub struct ModelNode {
    pub name: Option<String>,
    pub transform: DecomposedTransform,
    /// Indices of the child nodes in [`Model::nodes`].
    pub children: Vec<usize>,
    /// Index into [`Model::meshes`].
    pub mesh: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum ModelIndices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub vertex_type: VertexType,
    /// Interleaved vertex bytes in the `vertex_type` layout.
    pub vertices: Vec<u8>,
    pub indices: Option<ModelIndices>,
    /// Index into [`Model::materials`]; `None` uses the default material.
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelMesh {
    pub name: Option<String>,
    pub primitives: Vec<ModelPrimitive>,
}

/// Format-neutral model data as produced by a file loader.
///
/// Plain data with no GPU state; safe to send to a loader thread.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub nodes: Vec<ModelNode>,
    /// Index of the root node in `nodes`.
    pub root: usize,
    pub meshes: Vec<ModelMesh>,
    pub materials: Vec<RenderMaterial>,
}

/// Descriptive information some formats carry alongside the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub license: Option<String>,
}
