//! Model loading for Trellis.
//!
//! File parsing stays with the embedding application: it registers
//! [`ModelFileLoader`]s that produce format-neutral [`Model`] data. This
//! crate reconstructs scenes from that data off the main thread, caches
//! them per path and hands out reference-counted instances.

pub mod context;
pub mod load;
pub mod loader;
pub mod manager;
pub mod model;
pub mod reconstruct;

pub use context::SharedModelContext;
pub use load::{LoadHandle, ModelLoader};
pub use loader::{LoadResult, ModelFileLoader, ModelFileLoaders, PROBE_HEADER_LEN};
pub use manager::{ModelInstanceItem, ModelInstanceManager, ModelItem};
pub use model::{Model, ModelIndices, ModelMesh, ModelMetadata, ModelNode, ModelPrimitive};
pub use reconstruct::SceneReconstructor;
