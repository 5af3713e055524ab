//! Render Scene
//!
//! A [`RenderScene`] is the shared, immutable-shape definition of a model:
//! its node hierarchy plus the GPU resources of every primitive. Many
//! [`ModelInstance`](crate::ModelInstance)s may draw the same scene.
//!
//! The hierarchy is plain data and stays readable for the scene's whole
//! life. The GPU resources sit behind an explicit reference count and are
//! released by the call that brings the count to zero.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::MappedRwLockReadGuard;
use trellis_core::{RefCount, RefCounted, Result};
use trellis_resources::{BufferRef, RenderPrimitive};

use crate::hierarchy::TransformHierarchy;
use crate::node::TransformNode;

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(0);

/// A primitive placed at a node, as drawn by the model renderer.
#[derive(Debug, Clone)]
pub struct ScenePrimitive {
    /// Node whose world matrix positions this primitive.
    pub node: usize,
    pub primitive: RenderPrimitive,
    /// One `u32` holding `node`, read by the shader to pick its matrix.
    pub node_buffer: BufferRef,
}

impl ScenePrimitive {
    #[must_use]
    pub fn new(node: usize, primitive: RenderPrimitive) -> Self {
        let node_buffer = BufferRef::new(
            &[node as u32],
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            Some("PrimitiveNode"),
        );
        Self {
            node,
            primitive,
            node_buffer,
        }
    }
}

/// GPU resources owned by a scene.
#[derive(Debug, Default)]
pub struct SceneResources {
    pub primitives: Vec<ScenePrimitive>,
}

impl SceneResources {
    /// Every buffer the scene owns, vertex and index data first.
    pub fn buffers(&self) -> impl Iterator<Item = &BufferRef> {
        self.primitives.iter().flat_map(|scene_primitive| {
            let primitive = &scene_primitive.primitive;
            std::iter::once(&primitive.vertex_buffer.buffer)
                .chain(primitive.index_buffer.as_ref().map(|indices| &indices.buffer))
                .chain(std::iter::once(&scene_primitive.node_buffer))
        })
    }
}

/// Shared model definition with an explicit reference count.
///
/// The count starts at 0. Whoever receives a new scene must call
/// [`increase_reference_count`](RefCount::increase_reference_count) before
/// using its resources, and balance every increase with one decrease.
#[derive(Debug)]
pub struct RenderScene {
    id: u64,
    hierarchy: TransformHierarchy,
    resources: RefCounted<SceneResources>,
}

impl RenderScene {
    #[must_use]
    pub fn new(hierarchy: TransformHierarchy, resources: SceneResources) -> Self {
        let id = NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed);
        let resources = RefCounted::with_disposer("RenderScene", resources, move |resources| {
            log::debug!(
                "RenderScene {id} disposed, releasing {} primitives",
                resources.primitives.len()
            );
        });
        Self {
            id,
            hierarchy,
            resources,
        }
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn hierarchy(&self) -> &TransformHierarchy {
        &self.hierarchy
    }

    #[inline]
    #[must_use]
    pub fn root_node(&self) -> &TransformNode {
        self.hierarchy.root()
    }

    /// GPU resources; fails before the first acquire and after disposal.
    pub fn resources(&self) -> Result<MappedRwLockReadGuard<'_, SceneResources>> {
        self.resources.read()
    }

    /// Fails unless at least one holder currently owns a reference.
    pub fn check_in_use(&self) -> Result<()> {
        self.resources.counter().check_in_use()
    }
}

impl RefCount for RenderScene {
    fn increase_reference_count(&self) -> Result<u32> {
        self.resources.increase_reference_count()
    }

    fn decrease_reference_count(&self) -> Result<u32> {
        self.resources.decrease_reference_count()
    }

    fn reference_count(&self) -> u32 {
        self.resources.reference_count()
    }

    fn is_closed(&self) -> bool {
        self.resources.is_closed()
    }
}
