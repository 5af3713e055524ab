//! Model Instance
//!
//! A [`ModelInstance`] is one use of a shared [`RenderScene`]: it stores
//! per-node transform overrides and derives a matrix snapshot from them.
//!
//! # Edit / Recompute Protocol
//!
//! 1. [`set_transform_decomposed`](ModelInstance::set_transform_decomposed)
//!    stores an override and marks render data stale. Nothing is composed
//!    at this point, so any number of edits can be batched.
//! 2. [`update_render_data`](ModelInstance::update_render_data) walks the
//!    hierarchy parents-first and resolves every node's world matrix:
//!
//!    ```text
//!    local = (absolute override, else bind transform)
//!          * relative layer 0 * relative layer 1 * ...
//!    world = parent world * local
//!    ```
//!
//! 3. Readers of the snapshot get [`TrellisError::StaleRenderData`] if an
//!    edit happened after the last recomputation.
//!
//! # Ownership
//!
//! The instance keeps an `Arc` to its scene but never touches the scene's
//! reference count: whoever created the instance holds one scene reference
//! and releases it separately.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;
use rustc_hash::FxHashMap;
use trellis_core::{ChangeTracker, RefCount, RefCounted, Result, TrellisError};
use trellis_resources::BufferRef;

use crate::render_data::ModelMatricesBuffer;
use crate::scene::RenderScene;
use crate::transform::{DecomposedTransform, TransformId};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(0);

/// Transform overrides stored for one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOverrides {
    pub absolute: Option<DecomposedTransform>,
    /// Relative layers keyed by layer number; iterated in ascending order.
    pub relative: BTreeMap<u32, DecomposedTransform>,
}

impl NodeOverrides {
    /// Local matrix of the node given its bind transform.
    #[must_use]
    pub fn local_matrix(&self, bind: &DecomposedTransform) -> Mat4 {
        let base = self.absolute.as_ref().unwrap_or(bind).to_matrix();
        self.relative
            .values()
            .fold(base, |matrix, layer| matrix * layer.to_matrix())
    }
}

#[derive(Debug)]
struct InstanceState {
    overrides: FxHashMap<usize, NodeOverrides>,
    tracker: ChangeTracker,
    /// Tracker version the snapshot was derived from.
    computed: Option<u64>,
    matrices: Arc<ModelMatricesBuffer>,
    /// Upload copy of `matrices`; its version bumps on every recompute.
    matrices_buffer: BufferRef,
}

impl InstanceState {
    fn check_current(&self) -> Result<()> {
        if self.tracker.is_current(self.computed) {
            Ok(())
        } else {
            Err(TrellisError::StaleRenderData)
        }
    }
}

/// Mutable, reference-counted view of a [`RenderScene`].
#[derive(Debug)]
pub struct ModelInstance {
    id: u64,
    scene: Arc<RenderScene>,
    state: RefCounted<InstanceState>,
}

impl ModelInstance {
    /// Creates an instance with a reference count of 0.
    ///
    /// The caller must already hold a reference to `scene`; the instance
    /// itself does not acquire one.
    pub fn new(scene: Arc<RenderScene>) -> Result<Self> {
        scene.check_in_use()?;
        let id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        let len = scene.hierarchy().len();
        let matrices = ModelMatricesBuffer::new(len);
        let matrices_buffer = BufferRef::from_bytes(
            matrices.as_bytes(),
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            Some("ModelMatrices"),
        );
        let state = InstanceState {
            overrides: FxHashMap::default(),
            tracker: ChangeTracker::new(),
            computed: None,
            matrices: Arc::new(matrices),
            matrices_buffer,
        };
        let scene_id = scene.id();
        let state = RefCounted::with_disposer("ModelInstance", state, move |state| {
            log::debug!(
                "ModelInstance {id} of scene {scene_id} disposed ({} overridden nodes)",
                state.overrides.len()
            );
        });
        Ok(Self { id, scene, state })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &Arc<RenderScene> {
        &self.scene
    }

    fn check_node(&self, node: usize) -> Result<()> {
        self.scene.hierarchy().get(node).map(|_| ())
    }

    /// Edits the transform stored for `(node, id)`.
    ///
    /// `edit` receives the current value, or a fresh one: an absolute
    /// transform starts from the node's bind transform and a relative layer
    /// starts from identity. A relative layer naming a `base` requires that
    /// base to be a lower layer already set on this node.
    ///
    /// Render data becomes stale; call
    /// [`update_render_data`](Self::update_render_data) before drawing.
    pub fn set_transform_decomposed<F>(&self, node: usize, id: TransformId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut DecomposedTransform),
    {
        self.check_node(node)?;
        let bind = *self.scene.hierarchy().nodes()[node].bind_transform();
        let mut state = self.state.write()?;

        match id {
            TransformId::Absolute => {
                let overrides = state.overrides.entry(node).or_default();
                edit(overrides.absolute.get_or_insert(bind));
            }
            TransformId::Relative { layer, base } => {
                if let Some(base) = base {
                    let established = base < layer
                        && state
                            .overrides
                            .get(&node)
                            .is_some_and(|overrides| overrides.relative.contains_key(&base));
                    if !established {
                        return Err(TrellisError::MissingBaseTransform { node, layer, base });
                    }
                }
                let overrides = state.overrides.entry(node).or_default();
                edit(
                    overrides
                        .relative
                        .entry(layer)
                        .or_insert(DecomposedTransform::IDENTITY),
                );
            }
        }

        state.tracker.changed();
        Ok(())
    }

    /// The stored override for `(node, id)`, if any.
    pub fn transform(&self, node: usize, id: TransformId) -> Result<Option<DecomposedTransform>> {
        self.check_node(node)?;
        let state = self.state.read()?;
        let Some(overrides) = state.overrides.get(&node) else {
            return Ok(None);
        };
        Ok(match id {
            TransformId::Absolute => overrides.absolute,
            TransformId::Relative { layer, .. } => overrides.relative.get(&layer).copied(),
        })
    }

    /// Drops every override of `node`, returning it to its bind transform.
    pub fn clear_transforms(&self, node: usize) -> Result<()> {
        self.check_node(node)?;
        let mut state = self.state.write()?;
        if state.overrides.remove(&node).is_some() {
            state.tracker.changed();
        }
        Ok(())
    }

    /// Recomputes every node's world matrix from the bind transforms and the
    /// stored overrides.
    ///
    /// Always recomputes, even with no pending edit. The result depends only
    /// on the hierarchy and the overrides, so repeated calls yield identical
    /// snapshots.
    pub fn update_render_data(&self) -> Result<()> {
        let hierarchy = self.scene.hierarchy();
        let mut state = self.state.write()?;
        let state = &mut *state;

        let matrices = Arc::make_mut(&mut state.matrices);
        matrices.clear();

        let empty = NodeOverrides::default();
        for &index in hierarchy.traversal_order() {
            let node = &hierarchy.nodes()[index];
            let local = state
                .overrides
                .get(&index)
                .unwrap_or(&empty)
                .local_matrix(node.bind_transform());
            let parent_world = node
                .parent()
                .and_then(|parent| matrices.matrix(parent))
                .unwrap_or(Mat4::IDENTITY);
            matrices.set_matrix(index, parent_world * local);
        }

        state.matrices_buffer.update_bytes(matrices.as_bytes());
        state.computed = Some(state.tracker.version());
        Ok(())
    }

    /// Whether the snapshot reflects every edit made so far.
    pub fn is_render_data_current(&self) -> Result<bool> {
        Ok(self.state.read()?.check_current().is_ok())
    }

    /// Current snapshot of world matrices.
    pub fn model_matrices(&self) -> Result<Arc<ModelMatricesBuffer>> {
        let state = self.state.read()?;
        state.check_current()?;
        Ok(Arc::clone(&state.matrices))
    }

    /// Storage buffer holding the snapshot, for binding as `ModelMatrices`.
    pub fn matrices_buffer(&self) -> Result<BufferRef> {
        let state = self.state.read()?;
        state.check_current()?;
        Ok(state.matrices_buffer.clone())
    }

    /// World matrix of one node from the current snapshot.
    pub fn world_matrix(&self, node: usize) -> Result<Mat4> {
        self.check_node(node)?;
        let state = self.state.read()?;
        state.check_current()?;
        state
            .matrices
            .matrix(node)
            .ok_or(TrellisError::InvalidNodeIndex {
                index: node,
                len: state.matrices.len(),
            })
    }
}

impl RefCount for ModelInstance {
    fn increase_reference_count(&self) -> Result<u32> {
        self.state.increase_reference_count()
    }

    fn decrease_reference_count(&self) -> Result<u32> {
        self.state.decrease_reference_count()
    }

    fn reference_count(&self) -> u32 {
        self.state.reference_count()
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}
