use smallvec::SmallVec;

use crate::transform::DecomposedTransform;

/// Input to [`TransformHierarchy::build`](crate::TransformHierarchy::build):
/// one node with a link to its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    pub index: usize,
    pub name: String,
    pub parent: Option<usize>,
    /// Local transform the node has when no instance overrides it.
    pub transform: DecomposedTransform,
    /// Mesh drawn at this node, as an index into the scene's meshes.
    pub mesh: Option<usize>,
}

impl NodeDescriptor {
    #[must_use]
    pub fn new(index: usize, name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            index,
            name: name.into(),
            parent,
            transform: DecomposedTransform::IDENTITY,
            mesh: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: DecomposedTransform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: usize) -> Self {
        self.mesh = Some(mesh);
        self
    }
}

/// A node of a built hierarchy. Indices are dense and never change.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    index: usize,
    name: String,
    parent: Option<usize>,
    children: SmallVec<[usize; 4]>,
    depth: u32,
    bind_transform: DecomposedTransform,
    mesh: Option<usize>,
}

impl TransformNode {
    pub(crate) fn from_descriptor(descriptor: NodeDescriptor) -> Self {
        Self {
            index: descriptor.index,
            name: descriptor.name,
            parent: descriptor.parent,
            children: SmallVec::new(),
            depth: 0,
            bind_transform: descriptor.transform,
            mesh: descriptor.mesh,
        }
    }

    pub(crate) fn push_child(&mut self, child: usize) {
        self.children.push(child);
    }

    pub(crate) fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Children in ascending index order.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Distance from the root; the root has depth 0.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    #[must_use]
    pub fn bind_transform(&self) -> &DecomposedTransform {
        &self.bind_transform
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> Option<usize> {
        self.mesh
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
