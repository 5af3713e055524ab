use std::sync::Arc;

use trellis_core::{HierarchyDefect, Result, TrellisError, TrellisSettings};
use trellis_resources::{IndexBuffer, RenderMaterial, RenderPrimitive, VertexBuffer};
use trellis_scene::{
    NodeDescriptor, RenderScene, ScenePrimitive, SceneResources, TransformHierarchy,
};

use crate::model::{Model, ModelIndices};

/// Turns parsed [`Model`] data into a [`RenderScene`].
pub struct SceneReconstructor<'a> {
    model: &'a Model,
    settings: &'a TrellisSettings,
    materials: Vec<Arc<RenderMaterial>>,
}

impl<'a> SceneReconstructor<'a> {
    /// Builds the scene's hierarchy and GPU resource descriptors.
    ///
    /// The returned scene has a reference count of 0.
    pub fn reconstruct(model: &'a Model, settings: &'a TrellisSettings) -> Result<RenderScene> {
        let reconstructor = Self {
            model,
            settings,
            materials: model.materials.iter().cloned().map(Arc::new).collect(),
        };
        reconstructor.build()
    }

    fn build(&self) -> Result<RenderScene> {
        let hierarchy = TransformHierarchy::build(self.node_descriptors()?)?;

        let mut primitives = Vec::new();
        for node in hierarchy.nodes() {
            let Some(mesh_index) = node.mesh() else {
                continue;
            };
            let mesh = self.model.meshes.get(mesh_index).ok_or_else(|| {
                TrellisError::MissingResource(format!(
                    "mesh {mesh_index} referenced by node {}",
                    node.index()
                ))
            })?;
            for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
                let label = format!(
                    "{}#{primitive_index}",
                    mesh.name.as_deref().unwrap_or(node.name())
                );
                let label = Some(label.as_str());
                let vertex_buffer =
                    VertexBuffer::new(primitive.vertex_type, &primitive.vertices, label)?;
                let index_buffer = primitive.indices.as_ref().map(|indices| match indices {
                    ModelIndices::U16(indices) => IndexBuffer::from_u16(indices, label),
                    ModelIndices::U32(indices) => IndexBuffer::from_u32(indices, label),
                });
                let material = match primitive.material {
                    Some(material) => self.material(material)?,
                    None => RenderMaterial::default_material(),
                };
                primitives.push(ScenePrimitive::new(
                    node.index(),
                    RenderPrimitive {
                        vertex_buffer,
                        index_buffer,
                        material,
                    },
                ));
            }
        }

        if self.settings.development_checks {
            for scene_primitive in &primitives {
                scene_primitive.primitive.check_consistent()?;
            }
        }

        log::debug!(
            "Reconstructed scene: {} nodes, {} primitives",
            hierarchy.len(),
            primitives.len()
        );
        Ok(RenderScene::new(hierarchy, SceneResources { primitives }))
    }

    fn material(&self, index: usize) -> Result<Arc<RenderMaterial>> {
        self.materials
            .get(index)
            .cloned()
            .ok_or_else(|| TrellisError::MissingResource(format!("material {index}")))
    }

    /// Converts child lists into parent links.
    fn node_descriptors(&self) -> Result<Vec<NodeDescriptor>> {
        let nodes = &self.model.nodes;
        let len = nodes.len();
        if len == 0 {
            return Err(HierarchyDefect::Empty.into());
        }
        let root = self.model.root;
        if root >= len {
            return Err(HierarchyDefect::RootOutOfRange { root, len }.into());
        }

        let mut parents: Vec<Option<usize>> = vec![None; len];
        for (index, node) in nodes.iter().enumerate() {
            for &child in &node.children {
                if child >= len {
                    return Err(HierarchyDefect::MissingChild { node: index, child }.into());
                }
                if parents[child].is_some() {
                    return Err(HierarchyDefect::SharedChild { child }.into());
                }
                parents[child] = Some(index);
            }
        }
        if let Some(parent) = parents[root] {
            return Err(HierarchyDefect::RootHasParent { root, parent }.into());
        }

        Ok(nodes
            .iter()
            .zip(parents)
            .enumerate()
            .map(|(index, (node, parent))| NodeDescriptor {
                index,
                name: node
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("node_{index}")),
                parent,
                transform: node.transform,
                mesh: node.mesh,
            })
            .collect())
    }
}
