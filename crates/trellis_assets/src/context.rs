//! Owning context for a model shared by every renderer of one kind.
//!
//! ```rust,ignore
//! let mut context = SharedModelContext::new();
//! context.initialize(&loader, &loaders, Path::new("ball.glb"), |root| {
//!     root.scale_by(0.5).translate(Vec3::splat(0.5));
//! })?;
//!
//! // every frame, on the main thread
//! context.poll()?;
//! if let Some(instance) = context.instance() {
//!     ModelRenderer.render(&mut pass, instance, 1)?;
//! }
//!
//! // on shutdown
//! context.teardown()?;
//! ```

use std::path::Path;
use std::sync::Arc;

use trellis_core::{RefCount, Result, TrellisError};
use trellis_scene::{DecomposedTransform, ModelInstance, RenderScene, TransformId};

use crate::load::{LoadHandle, ModelLoader};
use crate::loader::ModelFileLoaders;

type RootEdit = Box<dyn FnOnce(&mut DecomposedTransform) + Send>;

#[derive(Default)]
enum ContextState {
    #[default]
    Idle,
    Loading {
        handle: LoadHandle,
        root_edit: RootEdit,
    },
    Ready {
        scene: Arc<RenderScene>,
        instance: Arc<ModelInstance>,
    },
    /// A load still in flight at teardown is drained here.
    TornDown { pending: Option<LoadHandle> },
}

/// One scene and one instance, loaded once and shared.
#[derive(Default)]
pub struct SharedModelContext {
    state: ContextState,
}

impl SharedModelContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and starts reconstruction. `root_edit` is applied to
    /// the root's absolute transform once the scene is installed.
    pub fn initialize<F>(
        &mut self,
        loader: &ModelLoader,
        loaders: &ModelFileLoaders,
        path: &Path,
        root_edit: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut DecomposedTransform) + Send + 'static,
    {
        match self.state {
            ContextState::Idle => {}
            ContextState::TornDown { .. } => {
                return Err(TrellisError::ResourceClosed {
                    resource: "SharedModelContext",
                });
            }
            ContextState::Loading { .. } | ContextState::Ready { .. } => {
                return Err(TrellisError::LoadFailed(
                    "shared model context is already initialized".to_string(),
                ));
            }
        }

        if !path.is_file() {
            return Err(TrellisError::MissingResource(path.display().to_string()));
        }
        let result = loaders
            .probe_and_load(path)?
            .ok_or_else(|| TrellisError::NoModelLoader(path.to_path_buf()))?;
        let model = result
            .model
            .ok_or_else(|| TrellisError::NoModel(path.to_path_buf()))?;

        self.state = ContextState::Loading {
            handle: loader.load_model_as_future(model),
            root_edit: Box::new(root_edit),
        };
        Ok(())
    }

    /// Installs a completed load. Returns whether the context is ready.
    ///
    /// A failed load returns its error and leaves the context idle, so
    /// [`initialize`](Self::initialize) may be retried.
    pub fn poll(&mut self) -> Result<bool> {
        match std::mem::take(&mut self.state) {
            ContextState::Loading { mut handle, root_edit } => {
                let Some(outcome) = handle.try_take() else {
                    self.state = ContextState::Loading { handle, root_edit };
                    return Ok(false);
                };
                let scene = outcome?;
                let instance = Self::install(&scene, root_edit)?;
                log::debug!(
                "Shared model ready: scene {}, instance {}",
                scene.id(),
                instance.id()
            );
                self.state = ContextState::Ready { scene, instance };
                Ok(true)
            }
            ContextState::TornDown { mut pending } => {
                let drained = Self::drain(&mut pending);
                self.state = ContextState::TornDown { pending };
                drained.map(|()| false)
            }
            state => {
                let ready = matches!(state, ContextState::Ready { .. });
                self.state = state;
                Ok(ready)
            }
        }
    }

    fn install(scene: &Arc<RenderScene>, root_edit: RootEdit) -> Result<Arc<ModelInstance>> {
        scene.increase_reference_count()?;
        let installed = ModelInstance::new(Arc::clone(scene)).and_then(|instance| {
            instance.increase_reference_count()?;
            let root = scene.root_node().index();
            let configured = instance
                .set_transform_decomposed(root, TransformId::Absolute, root_edit)
                .and_then(|()| instance.update_render_data());
            if let Err(err) = configured {
                instance.decrease_reference_count()?;
                return Err(err);
            }
            Ok(Arc::new(instance))
        });
        if installed.is_err() {
            scene.decrease_reference_count()?;
        }
        installed
    }

    /// Takes a late completion and disposes it.
    fn drain(pending: &mut Option<LoadHandle>) -> Result<()> {
        let Some(handle) = pending else {
            return Ok(());
        };
        match handle.try_take() {
            None => Ok(()),
            Some(outcome) => {
                *pending = None;
                if let Ok(scene) = outcome {
                    log::debug!("Disposing scene {} completed after teardown", scene.id());
                    scene.increase_reference_count()?;
                    scene.decrease_reference_count()?;
                }
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ContextState::Ready { .. })
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Arc<RenderScene>> {
        match &self.state {
            ContextState::Ready { scene, .. } => Some(scene),
            _ => None,
        }
    }

    #[must_use]
    pub fn instance(&self) -> Option<&Arc<ModelInstance>> {
        match &self.state {
            ContextState::Ready { instance, .. } => Some(instance),
            _ => None,
        }
    }

    /// Whether a load started before teardown has yet to be disposed.
    #[must_use]
    pub fn has_pending_load(&self) -> bool {
        matches!(self.state, ContextState::TornDown { pending: Some(_) })
    }

    /// Releases the instance and scene references taken by
    /// [`poll`](Self::poll). Calling it again does nothing.
    ///
    /// Both references are released even if the first release fails; the
    /// first error is returned and the context is torn down either way.
    pub fn teardown(&mut self) -> Result<()> {
        let (pending, released) = match std::mem::take(&mut self.state) {
            ContextState::Ready { scene, instance } => {
                let instance_released = instance.decrease_reference_count();
                let scene_released = scene.decrease_reference_count();
                (None, instance_released.and(scene_released).map(|_| ()))
            }
            ContextState::Loading { handle, .. } => (Some(handle), Ok(())),
            ContextState::TornDown { pending } => (pending, Ok(())),
            ContextState::Idle => (None, Ok(())),
        };
        self.state = ContextState::TornDown { pending };
        released
    }
}

impl Drop for SharedModelContext {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            log::warn!("Failed to tear down shared model: {err}");
        }
    }
}

impl std::fmt::Debug for SharedModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            ContextState::Idle => "Idle",
            ContextState::Loading { .. } => "Loading",
            ContextState::Ready { .. } => "Ready",
            ContextState::TornDown { .. } => "TornDown",
        };
        f.debug_struct("SharedModelContext").field("state", &state).finish()
    }
}
