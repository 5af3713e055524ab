//! Scene layer of Trellis: transform hierarchies, shared render scenes and
//! the model instances that pose them.

pub mod animation;
pub mod hierarchy;
pub mod instance;
pub mod node;
pub mod render_data;
pub mod scene;
pub mod transform;

pub use animation::{AnimationChannel, ChannelTrack, InterpolationMode, KeyframeTrack};
pub use hierarchy::TransformHierarchy;
pub use instance::{ModelInstance, NodeOverrides};
pub use node::{NodeDescriptor, TransformNode};
pub use render_data::{MAT4X4_SIZE, ModelMatricesBuffer};
pub use scene::{RenderScene, ScenePrimitive, SceneResources};
pub use transform::{DecomposedTransform, TransformId};
