//! Asynchronous scene loading
//!
//! Reconstruction runs on a blocking worker of a dedicated runtime. The
//! result travels back through a one-slot channel and is picked up on the
//! main thread with [`LoadHandle::try_take`], or awaited.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Instant;

use flume::{Receiver, TryRecvError};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::{Builder, Runtime};

use trellis_core::{Result, TrellisError, TrellisSettings};
use trellis_scene::RenderScene;

use crate::model::Model;
use crate::reconstruct::SceneReconstructor;

pub(crate) type LoadOutcome = Result<Arc<RenderScene>>;

/// Turns [`Model`] data into scenes off the main thread.
pub struct ModelLoader {
    runtime: Runtime,
    settings: Arc<TrellisSettings>,
}

impl ModelLoader {
    pub fn new(settings: TrellisSettings) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .thread_name("trellis-loader")
            .build()?;
        Ok(Self {
            runtime,
            settings: Arc::new(settings),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &TrellisSettings {
        &self.settings
    }

    /// Starts reconstructing `model` and returns a handle to the result.
    ///
    /// The delivered scene has a reference count of 0; whoever takes it
    /// acquires it. Dropping the handle first simply drops the scene.
    pub fn load_model_as_future(&self, model: Model) -> LoadHandle {
        let (sender, receiver) = flume::bounded(1);
        let settings = Arc::clone(&self.settings);

        self.runtime.spawn(async move {
            let start = Instant::now();
            let outcome = tokio::task::spawn_blocking(move || {
                SceneReconstructor::reconstruct(&model, &settings).map(RenderScene::into_shared)
            })
            .await
            .unwrap_or_else(|err| Err(TrellisError::TaskJoinError(err.to_string())));

            match &outcome {
                Ok(scene) => log::info!(
                    "Scene {} loaded, duration: {:?}",
                    scene.id(),
                    start.elapsed()
                ),
                Err(err) => log::warn!("Model load failed: {err}"),
            }

            if sender.send(outcome).is_err() {
                log::warn!("Model load completed after its handle was dropped");
            }
        });

        LoadHandle::new(receiver)
    }
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Completion of one [`ModelLoader::load_model_as_future`] call.
///
/// The result is delivered at most once.
#[derive(Debug)]
pub struct LoadHandle {
    receiver: Receiver<LoadOutcome>,
    taken: bool,
}

impl LoadHandle {
    pub(crate) fn new(receiver: Receiver<LoadOutcome>) -> Self {
        Self {
            receiver,
            taken: false,
        }
    }

    /// Non-blocking poll. Returns `None` while the load is running and after
    /// the result has been taken.
    pub fn try_take(&mut self) -> Option<LoadOutcome> {
        if self.taken {
            return None;
        }
        let outcome = match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(TrellisError::LoadCancelled),
        };
        self.taken = true;
        Some(outcome)
    }

    #[must_use]
    pub fn is_taken(&self) -> bool {
        self.taken
    }

    /// Blocks until the load completes.
    pub fn wait(self) -> LoadOutcome {
        if self.taken {
            return Err(TrellisError::LoadCancelled);
        }
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(TrellisError::LoadCancelled))
    }
}

impl IntoFuture for LoadHandle {
    type Output = LoadOutcome;
    type IntoFuture = BoxFuture<'static, LoadOutcome>;

    fn into_future(self) -> Self::IntoFuture {
        async move {
            if self.taken {
                return Err(TrellisError::LoadCancelled);
            }
            self.receiver
                .recv_async()
                .await
                .unwrap_or_else(|_| Err(TrellisError::LoadCancelled))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelMesh, ModelNode, ModelPrimitive};
    use trellis_core::RefCount;
    use trellis_resources::VertexType;

    fn model() -> Model {
        Model {
            nodes: vec![ModelNode {
                name: Some("ball".to_string()),
                mesh: Some(0),
                ..Default::default()
            }],
            root: 0,
            meshes: vec![ModelMesh {
                name: None,
                primitives: vec![ModelPrimitive {
                    vertex_type: VertexType::Position,
                    vertices: vec![0u8; 36],
                    indices: None,
                    material: None,
                }],
            }],
            materials: Vec::new(),
        }
    }

    #[test]
    fn delivers_an_unacquired_scene() {
        let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
        let scene = loader.load_model_as_future(model()).wait().unwrap();
        assert_eq!(scene.reference_count(), 0);
        assert_eq!(scene.root_node().name(), "ball");
    }

    #[test]
    fn try_take_delivers_once() {
        let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
        let mut handle = loader.load_model_as_future(model());

        let outcome = loop {
            if let Some(outcome) = handle.try_take() {
                break outcome;
            }
            std::thread::yield_now();
        };
        assert!(outcome.is_ok());
        assert!(handle.is_taken());
        assert!(handle.try_take().is_none());
    }

    #[test]
    fn failures_come_through_the_handle() {
        let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
        let mut broken = model();
        broken.root = 4;
        let outcome = pollster::block_on(loader.load_model_as_future(broken));
        assert!(matches!(outcome, Err(TrellisError::MalformedHierarchy(_))));
    }
}
