//! ModelInstance tests
//!
//! Tests for:
//! - The absolute/relative transform protocol
//! - World matrix propagation in updateRenderData
//! - Stale render data detection
//! - Snapshot determinism
//! - Animation channels writing through transform slots

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use trellis::core::{RefCount, TrellisError};
use trellis::scene::{
    AnimationChannel, ChannelTrack, DecomposedTransform, InterpolationMode, KeyframeTrack,
    ModelInstance, NodeDescriptor, RenderScene, SceneResources, TransformHierarchy, TransformId,
};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn mat4_approx(a: Mat4, b: Mat4) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn acquired_instance(descriptors: Vec<NodeDescriptor>) -> ModelInstance {
    let hierarchy = TransformHierarchy::build(descriptors).unwrap();
    let scene = RenderScene::new(hierarchy, SceneResources::default()).into_shared();
    scene.increase_reference_count().unwrap();
    let instance = ModelInstance::new(scene).unwrap();
    instance.increase_reference_count().unwrap();
    instance
}

fn root_and_child() -> ModelInstance {
    acquired_instance(vec![
        NodeDescriptor::new(0, "root", None),
        NodeDescriptor::new(1, "child", Some(0)),
    ])
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn absolute_edit_on_root_moves_the_whole_model() {
    let instance = root_and_child();

    instance
        .set_transform_decomposed(0, TransformId::Absolute, |transform| {
            transform.scale *= 0.5;
            transform.translation += Vec3::splat(0.5);
        })
        .unwrap();
    instance.update_render_data().unwrap();

    let expected = Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(Vec3::splat(0.5));
    let root = instance.world_matrix(0).unwrap();
    assert!(mat4_approx(root, expected));
    assert!(mat4_approx(instance.world_matrix(1).unwrap(), root * Mat4::IDENTITY));
}

#[test]
fn render_data_defaults_to_bind_pose() {
    let instance = acquired_instance(vec![
        NodeDescriptor::new(0, "root", None)
            .with_transform(DecomposedTransform::from_translation(Vec3::X)),
        NodeDescriptor::new(1, "child", Some(0))
            .with_transform(DecomposedTransform::from_translation(Vec3::Y)),
    ]);
    instance.update_render_data().unwrap();

    let child = instance.world_matrix(1).unwrap();
    assert!(child.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), EPSILON));
}

// ============================================================================
// Transform Protocol
// ============================================================================

#[test]
fn absolute_starts_from_bind_and_replaces_it() {
    let bind = DecomposedTransform::new(
        Vec3::new(1.0, 2.0, 3.0),
        Quat::IDENTITY,
        Vec3::splat(2.0),
    );
    let instance =
        acquired_instance(vec![NodeDescriptor::new(0, "root", None).with_transform(bind)]);

    let mut seen = None;
    instance
        .set_transform_decomposed(0, TransformId::Absolute, |transform| {
            seen = Some(*transform);
            transform.translation = Vec3::ZERO;
        })
        .unwrap();
    assert_eq!(seen, Some(bind));

    instance.update_render_data().unwrap();
    let expected = Mat4::from_scale(Vec3::splat(2.0));
    assert!(mat4_approx(instance.world_matrix(0).unwrap(), expected));
}

#[test]
fn absolute_is_exact_regardless_of_relative_layers() {
    let instance = root_and_child();
    let absolute = DecomposedTransform::new(
        Vec3::new(0.25, -1.0, 4.0),
        Quat::from_rotation_y(0.7),
        Vec3::new(1.0, 2.0, 0.5),
    );

    instance
        .set_transform_decomposed(1, TransformId::relative(0), |transform| {
            transform.translate(Vec3::X);
        })
        .unwrap();
    instance
        .set_transform_decomposed(1, TransformId::Absolute, |transform| *transform = absolute)
        .unwrap();

    assert_eq!(
        instance.transform(1, TransformId::Absolute).unwrap(),
        Some(absolute)
    );
    assert_eq!(absolute.to_matrix(), Mat4::from_scale_rotation_translation(
        absolute.scale,
        absolute.rotation,
        absolute.translation,
    ));
}

#[test]
fn relative_layers_compose_on_top_of_absolute() {
    let instance = root_and_child();
    instance
        .set_transform_decomposed(0, TransformId::Absolute, |transform| {
            transform.translation = Vec3::X;
        })
        .unwrap();
    instance
        .set_transform_decomposed(0, TransformId::relative(1), |transform| {
            transform.translate(Vec3::Y);
        })
        .unwrap();
    instance
        .set_transform_decomposed(0, TransformId::relative_to(2, 1), |transform| {
            transform.scale_by(2.0);
        })
        .unwrap();
    instance.update_render_data().unwrap();

    let expected = Mat4::from_translation(Vec3::X)
        * Mat4::from_translation(Vec3::Y)
        * Mat4::from_scale(Vec3::splat(2.0));
    assert!(mat4_approx(instance.world_matrix(0).unwrap(), expected));
}

#[test]
fn relative_without_base_is_an_error() {
    let instance = root_and_child();
    let result = instance.set_transform_decomposed(1, TransformId::relative_to(3, 2), |_| {});
    assert!(matches!(
        result,
        Err(TrellisError::MissingBaseTransform {
            node: 1,
            layer: 3,
            base: 2
        })
    ));
    assert_eq!(instance.transform(1, TransformId::relative(3)).unwrap(), None);
}

#[test]
fn invalid_node_index_is_rejected() {
    let instance = root_and_child();
    let result = instance.set_transform_decomposed(9, TransformId::Absolute, |_| {});
    assert!(matches!(
        result,
        Err(TrellisError::InvalidNodeIndex { index: 9, len: 2 })
    ));
}

#[test]
fn clearing_returns_to_bind_pose() {
    let instance = root_and_child();
    instance
        .set_transform_decomposed(0, TransformId::Absolute, |transform| {
            transform.translation = Vec3::Z;
        })
        .unwrap();
    instance.clear_transforms(0).unwrap();
    instance.update_render_data().unwrap();
    assert_eq!(instance.world_matrix(0).unwrap(), Mat4::IDENTITY);
}

// ============================================================================
// Render Data
// ============================================================================

#[test]
fn edits_make_render_data_stale() {
    let instance = root_and_child();
    assert!(!instance.is_render_data_current().unwrap());
    assert!(matches!(
        instance.model_matrices(),
        Err(TrellisError::StaleRenderData)
    ));

    instance.update_render_data().unwrap();
    assert!(instance.is_render_data_current().unwrap());

    instance
        .set_transform_decomposed(1, TransformId::Absolute, |transform| {
            transform.rotate(Quat::from_rotation_z(0.3));
        })
        .unwrap();
    assert!(!instance.is_render_data_current().unwrap());
    assert!(matches!(
        instance.world_matrix(1),
        Err(TrellisError::StaleRenderData)
    ));
}

#[test]
fn update_is_deterministic() {
    let instance = root_and_child();
    instance
        .set_transform_decomposed(0, TransformId::Absolute, |transform| {
            transform.rotate(Quat::from_rotation_x(1.1)).translate(Vec3::new(0.1, 0.2, 0.3));
        })
        .unwrap();

    instance.update_render_data().unwrap();
    let first = instance.model_matrices().unwrap();
    let first_bytes = first.as_bytes().to_vec();
    let first_version = instance.matrices_buffer().unwrap().version();

    instance.update_render_data().unwrap();
    let second = instance.model_matrices().unwrap();
    assert_eq!(first_bytes, second.as_bytes());
    assert_eq!(*first, *second);
    assert_eq!(instance.matrices_buffer().unwrap().read_data().as_slice(), first_bytes.as_slice());
    assert!(instance.matrices_buffer().unwrap().version() > first_version);
}

#[test]
fn instances_of_one_scene_are_independent() {
    let first = root_and_child();
    let scene = Arc::clone(first.scene());
    scene.increase_reference_count().unwrap();
    let second = ModelInstance::new(Arc::clone(&scene)).unwrap();
    second.increase_reference_count().unwrap();

    first
        .set_transform_decomposed(0, TransformId::Absolute, |transform| {
            transform.translation = Vec3::X;
        })
        .unwrap();
    first.update_render_data().unwrap();
    second.update_render_data().unwrap();

    assert_ne!(first.world_matrix(0).unwrap(), second.world_matrix(0).unwrap());
    assert_ne!(first.id(), second.id());
}

// ============================================================================
// Animation
// ============================================================================

#[test]
fn animation_channel_drives_a_relative_layer() {
    let instance = root_and_child();
    let track = KeyframeTrack::new(
        vec![0.0, 2.0],
        vec![Vec3::ZERO, Vec3::new(0.0, 4.0, 0.0)],
        InterpolationMode::Linear,
    )
    .unwrap();
    let channel =
        AnimationChannel::new(1, TransformId::relative(0), ChannelTrack::Translation(track));
    assert_eq!(channel.duration(), 2.0);

    channel.apply(&instance, 0.5).unwrap();
    assert!(!instance.is_render_data_current().unwrap());
    instance.update_render_data().unwrap();

    let world = instance.world_matrix(1).unwrap();
    assert!(world.w_axis.truncate().abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), EPSILON));
}

#[test]
fn keyframe_tracks_validate_their_input() {
    assert!(KeyframeTrack::<Vec3>::new(Vec::new(), Vec::new(), InterpolationMode::Step).is_err());
    assert!(KeyframeTrack::new(vec![0.0, 1.0], vec![Vec3::ZERO], InterpolationMode::Step).is_err());
    assert!(
        KeyframeTrack::new(vec![1.0, 0.0], vec![Vec3::ZERO, Vec3::ONE], InterpolationMode::Linear)
            .is_err()
    );
}
