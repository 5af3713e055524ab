//! Loading pipeline tests
//!
//! Tests for:
//! - Loader probing by signature and extension
//! - Async scene delivery through LoadHandle
//! - ModelInstanceManager caching and animation
//! - SharedModelContext initialize / poll / teardown

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use trellis::assets::{
    LoadResult, Model, ModelFileLoader, ModelFileLoaders, ModelInstanceManager, ModelLoader,
    ModelMetadata, ModelNode, SharedModelContext,
};
use trellis::core::{RefCount, TrellisError, TrellisSettings};
use trellis::scene::{
    AnimationChannel, ChannelTrack, InterpolationMode, KeyframeTrack, TransformId,
};
use uuid::Uuid;

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

/// `BALL` signature, then the node count. Nodes form a chain from node 0.
struct BallLoader;

impl ModelFileLoader for BallLoader {
    fn name(&self) -> &str {
        "ball"
    }

    fn extensions(&self) -> &[&str] {
        &["ball"]
    }

    fn probe_header(&self, header: &[u8]) -> bool {
        header.starts_with(b"BALL")
    }

    fn load(&self, path: &Path) -> trellis::Result<LoadResult> {
        let text = std::fs::read_to_string(path)?;
        let count: usize = text
            .lines()
            .nth(1)
            .and_then(|line| line.trim().parse().ok())
            .ok_or_else(|| {
                TrellisError::LoadFailed(format!("{}: no node count", path.display()))
            })?;
        let nodes = (0..count)
            .map(|index| ModelNode {
                name: Some(format!("ball_{index}")),
                children: (index + 1 < count).then_some(index + 1).into_iter().collect(),
                ..Default::default()
            })
            .collect();
        let spin = KeyframeTrack::new(
            vec![0.0, 1.0],
            vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)],
            InterpolationMode::Linear,
        )?;
        Ok(LoadResult {
            metadata: Some(ModelMetadata {
                title: Some("Ball".to_string()),
                ..Default::default()
            }),
            model: Some(Model {
                nodes,
                ..Default::default()
            }),
            animations: vec![AnimationChannel::new(
                0,
                TransformId::relative(0),
                ChannelTrack::Translation(spin),
            )],
        })
    }
}

/// Metadata-only format.
struct NotesLoader;

impl ModelFileLoader for NotesLoader {
    fn name(&self) -> &str {
        "notes"
    }

    fn extensions(&self) -> &[&str] {
        &["notes"]
    }

    fn load(&self, _path: &Path) -> trellis::Result<LoadResult> {
        Ok(LoadResult::default())
    }
}

fn loaders() -> ModelFileLoaders {
    let mut loaders = ModelFileLoaders::new();
    loaders.register(NotesLoader).register(BallLoader);
    loaders
}

fn model_dir() -> PathBuf {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = std::env::temp_dir().join(format!("trellis-loader-tests-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("ball.ball"), "BALL\n2\n").unwrap();
    // signature wins over the extension
    std::fs::write(dir.join("disguised.notes"), "BALL\n1\n").unwrap();
    std::fs::write(dir.join("readme.notes"), "just notes").unwrap();
    std::fs::write(dir.join("unknown.bin"), [0u8; 16]).unwrap();
    std::fs::write(dir.join("empty.ball"), "BALL\n0\n").unwrap();
    dir
}

fn poll_until_settled(context: &mut SharedModelContext) -> trellis::Result<bool> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match context.poll() {
            Ok(false) if Instant::now() < deadline => thread::sleep(Duration::from_millis(1)),
            other => return other,
        }
    }
}

// ============================================================================
// Probing
// ============================================================================

#[test]
fn probe_prefers_signature_then_extension() {
    let dir = model_dir();
    let loaders = loaders();

    let by_extension = loaders.probe(&dir.join("readme.notes")).unwrap().unwrap();
    assert_eq!(by_extension.name(), "notes");

    let by_signature = loaders.probe(&dir.join("disguised.notes")).unwrap().unwrap();
    assert_eq!(by_signature.name(), "ball");

    assert!(loaders.probe(&dir.join("unknown.bin")).unwrap().is_none());
    assert!(matches!(
        loaders.probe(&dir.join("absent.ball")),
        Err(TrellisError::IoError(_))
    ));
}

#[test]
fn probe_and_load_returns_optional_model() {
    let dir = model_dir();
    let loaders = loaders();

    let ball = loaders.probe_and_load(&dir.join("ball.ball")).unwrap().unwrap();
    assert_eq!(ball.model.unwrap().nodes.len(), 2);
    assert_eq!(ball.animations.len(), 1);

    let notes = loaders.probe_and_load(&dir.join("readme.notes")).unwrap().unwrap();
    assert!(notes.model.is_none());

    assert!(loaders.probe_and_load(&dir.join("unknown.bin")).unwrap().is_none());
}

// ============================================================================
// Async Loading
// ============================================================================

#[test]
fn load_handle_delivers_a_scene_to_acquire() {
    let dir = model_dir();
    let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
    let model = loaders()
        .probe_and_load(&dir.join("ball.ball"))
        .unwrap()
        .and_then(|result| result.model)
        .unwrap();

    let scene = pollster::block_on(loader.load_model_as_future(model)).unwrap();
    assert_eq!(scene.reference_count(), 0);
    assert_eq!(scene.hierarchy().find_by_name("ball_1").unwrap().parent(), Some(0));

    scene.increase_reference_count().unwrap();
    scene.decrease_reference_count().unwrap();
    assert!(scene.is_closed());
}

#[test]
fn dropped_handle_does_not_disturb_the_loader() {
    let dir = model_dir();
    let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
    let model = loaders()
        .probe_and_load(&dir.join("ball.ball"))
        .unwrap()
        .and_then(|result| result.model)
        .unwrap();

    drop(loader.load_model_as_future(model.clone()));
    assert!(loader.load_model_as_future(model).wait().is_ok());
}

// ============================================================================
// ModelInstanceManager
// ============================================================================

#[test]
fn manager_resolves_paths_against_model_dir() -> anyhow::Result<()> {
    let dir = model_dir();
    let settings = TrellisSettings {
        model_dir: dir,
        ..Default::default()
    };
    let mut manager = ModelInstanceManager::new(settings, loaders());
    let owner = Uuid::new_v4();

    let item = manager.get(owner, Path::new("ball.ball"), Instant::now())?;
    let model = item.as_model().expect("ball.ball loads");
    assert_eq!(model.metadata().and_then(|m| m.title.as_deref()), Some("Ball"));
    assert_eq!(model.animations().len(), 1);
    assert!(model.instance().is_render_data_current()?);

    let empty = manager.get(owner, Path::new("empty.ball"), Instant::now())?;
    assert!(empty.as_model().is_none());
    Ok(())
}

#[test]
fn manager_applies_animations() {
    let dir = model_dir();
    let settings = TrellisSettings {
        model_dir: dir,
        ..Default::default()
    };
    let mut manager = ModelInstanceManager::new(settings, loaders());
    let owner = Uuid::new_v4();
    manager.get(owner, Path::new("ball.ball"), Instant::now()).unwrap();

    manager.apply_animations(&owner, 0.25).unwrap();
    let instance = Arc::clone(manager.peek(&owner).unwrap().as_model().unwrap().instance());
    let expected = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
    assert!(instance.world_matrix(0).unwrap().abs_diff_eq(expected, EPSILON));
    assert!(instance.world_matrix(1).unwrap().abs_diff_eq(expected, EPSILON));

    // unknown owners are a no-op
    manager.apply_animations(&Uuid::new_v4(), 0.25).unwrap();
}

// ============================================================================
// SharedModelContext
// ============================================================================

#[test]
fn context_reports_unloadable_files() {
    let dir = model_dir();
    let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
    let loaders = loaders();
    let mut context = SharedModelContext::new();

    assert!(matches!(
        context.initialize(&loader, &loaders, &dir.join("absent.ball"), |_| {}),
        Err(TrellisError::MissingResource(_))
    ));
    assert!(matches!(
        context.initialize(&loader, &loaders, &dir.join("unknown.bin"), |_| {}),
        Err(TrellisError::NoModelLoader(_))
    ));
    assert!(matches!(
        context.initialize(&loader, &loaders, &dir.join("readme.notes"), |_| {}),
        Err(TrellisError::NoModel(_))
    ));
    assert!(!context.poll().unwrap());
}

#[test]
fn context_installs_scene_and_instance() {
    let dir = model_dir();
    let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
    let mut context = SharedModelContext::new();

    context
        .initialize(&loader, &loaders(), &dir.join("ball.ball"), |root| {
            root.scale *= 0.5;
            root.translation += Vec3::splat(0.5);
        })
        .unwrap();
    assert!(context.instance().is_none());
    assert!(poll_until_settled(&mut context).unwrap());
    assert!(context.is_ready());

    let scene = Arc::clone(context.scene().unwrap());
    let instance = Arc::clone(context.instance().unwrap());
    assert_eq!(scene.reference_count(), 1);
    assert_eq!(instance.reference_count(), 1);

    let expected = Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(Vec3::splat(0.5));
    assert!(instance.world_matrix(0).unwrap().abs_diff_eq(expected, EPSILON));
    assert!(instance.world_matrix(1).unwrap().abs_diff_eq(expected, EPSILON));

    context.teardown().unwrap();
    assert!(instance.is_closed());
    assert!(scene.is_closed());
    assert!(context.instance().is_none());

    // second teardown releases nothing
    context.teardown().unwrap();
    assert!(matches!(
        context.initialize(&loader, &loaders(), &dir.join("ball.ball"), |_| {}),
        Err(TrellisError::ResourceClosed { .. })
    ));
}

#[test]
fn context_failure_can_be_retried() {
    let dir = model_dir();
    let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
    let mut context = SharedModelContext::new();

    context
        .initialize(&loader, &loaders(), &dir.join("empty.ball"), |_| {})
        .unwrap();
    assert!(matches!(
        poll_until_settled(&mut context),
        Err(TrellisError::MalformedHierarchy(_))
    ));
    assert!(!context.is_ready());

    context
        .initialize(&loader, &loaders(), &dir.join("ball.ball"), |_| {})
        .unwrap();
    assert!(poll_until_settled(&mut context).unwrap());
}

#[test]
fn context_teardown_during_load_is_safe() {
    let dir = model_dir();
    let loader = ModelLoader::new(TrellisSettings::default()).unwrap();
    let mut context = SharedModelContext::new();

    context
        .initialize(&loader, &loaders(), &dir.join("ball.ball"), |_| {})
        .unwrap();
    context.teardown().unwrap();
    assert!(context.has_pending_load());

    // the late completion is drained and disposed without installing anything
    let deadline = Instant::now() + Duration::from_secs(10);
    while context.has_pending_load() && Instant::now() < deadline {
        assert!(!context.poll().unwrap());
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!context.has_pending_load());
    assert!(context.scene().is_none());
    assert!(context.instance().is_none());
    assert!(!context.poll().unwrap());
}
