//! Per-owner model instances over a per-path scene cache.
//!
//! Reference discipline:
//! - a loaded cache entry holds one reference to its scene;
//! - each owner's instance item holds one reference to its instance and one
//!   to the scene;
//! - [`ModelInstanceManager::cleanup`] releases idle items and scenes no item
//!   uses anymore. Dropping the manager releases everything.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use uuid::Uuid;

use trellis_core::{RefCount, Result, TrellisError, TrellisSettings};
use trellis_scene::{AnimationChannel, ModelInstance, RenderScene};

use crate::loader::ModelFileLoaders;
use crate::model::ModelMetadata;
use crate::reconstruct::SceneReconstructor;

enum ModelCache {
    /// The load failed; not retried while cached.
    Failed,
    Loaded {
        scene: Arc<RenderScene>,
        metadata: Option<ModelMetadata>,
        animations: Arc<[AnimationChannel]>,
    },
}

/// A live instance of a cached model, owned by one UUID.
#[derive(Debug)]
pub struct ModelItem {
    path: PathBuf,
    instance: Arc<ModelInstance>,
    last_access: Instant,
    metadata: Option<ModelMetadata>,
    animations: Arc<[AnimationChannel]>,
}

impl ModelItem {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn instance(&self) -> &Arc<ModelInstance> {
        &self.instance
    }

    #[must_use]
    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    #[must_use]
    pub fn animations(&self) -> &[AnimationChannel] {
        &self.animations
    }

    /// Releases both references, returning the first failure.
    fn release(&self) -> Result<()> {
        let instance = self.instance.decrease_reference_count();
        let scene = self.instance.scene().decrease_reference_count();
        instance.and(scene).map(|_| ())
    }
}

#[derive(Debug)]
pub enum ModelInstanceItem {
    Failed { path: PathBuf },
    Model(ModelItem),
}

impl ModelInstanceItem {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Failed { path } => path,
            Self::Model(item) => &item.path,
        }
    }

    #[must_use]
    pub fn as_model(&self) -> Option<&ModelItem> {
        match self {
            Self::Failed { .. } => None,
            Self::Model(item) => Some(item),
        }
    }

    fn release(&self) -> Result<()> {
        match self {
            Self::Failed { .. } => Ok(()),
            Self::Model(item) => item.release(),
        }
    }
}

pub struct ModelInstanceManager {
    settings: TrellisSettings,
    loaders: ModelFileLoaders,
    caches: FxHashMap<PathBuf, ModelCache>,
    items: FxHashMap<Uuid, ModelInstanceItem>,
    /// Owners whose items never expire.
    pinned: FxHashSet<Uuid>,
}

impl ModelInstanceManager {
    #[must_use]
    pub fn new(settings: TrellisSettings, loaders: ModelFileLoaders) -> Self {
        Self {
            settings,
            loaders,
            caches: FxHashMap::default(),
            items: FxHashMap::default(),
            pinned: FxHashSet::default(),
        }
    }

    /// The item `owner` uses for `path`, loading the model if needed.
    ///
    /// An owner switching paths releases its previous item. A failed load
    /// yields [`ModelInstanceItem::Failed`].
    pub fn get(&mut self, owner: Uuid, path: &Path, now: Instant) -> Result<&ModelInstanceItem> {
        let reuse = self
            .items
            .get(&owner)
            .is_some_and(|item| item.path() == path);

        if !reuse {
            let item = self.create_item(path, now)?;
            if let Some(previous) = self.items.insert(owner, item) {
                previous.release()?;
            }
            log::info!("Loaded model {} for {owner}", path.display());
        }

        let item = self
            .items
            .get_mut(&owner)
            .ok_or_else(|| TrellisError::MissingResource(format!("model item of {owner}")))?;
        if let ModelInstanceItem::Model(model) = item {
            model.last_access = now;
        }
        Ok(item)
    }

    /// The current item of `owner` without loading or touching its access time.
    #[must_use]
    pub fn peek(&self, owner: &Uuid) -> Option<&ModelInstanceItem> {
        self.items.get(owner)
    }

    /// Keeps `owner`'s item and its scene alive through [`cleanup`](Self::cleanup).
    pub fn pin(&mut self, owner: Uuid) {
        self.pinned.insert(owner);
    }

    pub fn unpin(&mut self, owner: &Uuid) {
        self.pinned.remove(owner);
    }

    /// Drops `owner`'s item. Returns whether there was one.
    pub fn release(&mut self, owner: &Uuid) -> Result<bool> {
        match self.items.remove(owner) {
            Some(item) => {
                item.release()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Releases items idle for longer than the configured expiry, then
    /// scenes that no remaining item uses. Failed entries are evicted with
    /// their paths, so a later [`get`](Self::get) retries them.
    pub fn cleanup(&mut self, now: Instant) -> Result<()> {
        let expire = self.settings.instance_expire;
        let mut used: FxHashSet<PathBuf> = FxHashSet::default();
        let mut expired = Vec::new();

        for (owner, item) in &self.items {
            let keep = match item {
                _ if self.pinned.contains(owner) => true,
                ModelInstanceItem::Failed { .. } => continue,
                ModelInstanceItem::Model(model) => {
                    now.saturating_duration_since(model.last_access) <= expire
                }
            };
            if keep {
                used.insert(item.path().to_path_buf());
            } else {
                expired.push(*owner);
            }
        }

        let mut released = Ok(());
        for owner in expired {
            if let Some(item) = self.items.remove(&owner) {
                log::debug!("Model instance of {owner} expired");
                released = released.and(item.release());
            }
        }

        let stale: Vec<PathBuf> = self
            .caches
            .keys()
            .filter(|path| !used.contains(*path))
            .cloned()
            .collect();
        for path in stale {
            if let Some(ModelCache::Loaded { scene, .. }) = self.caches.remove(&path) {
                log::debug!("Model {} evicted", path.display());
                released = released.and(scene.decrease_reference_count().map(|_| ()));
            }
        }
        released
    }

    /// Samples every animation channel of `owner`'s model at `time` and
    /// refreshes the instance's render data.
    pub fn apply_animations(&self, owner: &Uuid, time: f32) -> Result<()> {
        let Some(ModelInstanceItem::Model(item)) = self.items.get(owner) else {
            return Ok(());
        };
        for channel in item.animations.iter() {
            channel.apply(&item.instance, time)?;
        }
        item.instance.update_render_data()
    }

    #[must_use]
    pub fn cached_models(&self) -> usize {
        self.caches.len()
    }

    fn create_item(&mut self, path: &Path, now: Instant) -> Result<ModelInstanceItem> {
        let cache = self.load_cache(path)?;
        let ModelCache::Loaded {
            scene,
            metadata,
            animations,
        } = cache
        else {
            return Ok(ModelInstanceItem::Failed {
                path: path.to_path_buf(),
            });
        };

        let instance = Arc::new(ModelInstance::new(Arc::clone(scene))?);
        scene.increase_reference_count()?;
        instance.increase_reference_count()?;
        instance.update_render_data()?;

        Ok(ModelInstanceItem::Model(ModelItem {
            path: path.to_path_buf(),
            instance,
            last_access: now,
            metadata: metadata.clone(),
            animations: Arc::clone(animations),
        }))
    }

    fn load_cache(&mut self, path: &Path) -> Result<&ModelCache> {
        if !self.caches.contains_key(path) {
            let cache = self.load_model(path);
            if let ModelCache::Loaded { scene, .. } = &cache {
                scene.increase_reference_count()?;
            }
            self.caches.insert(path.to_path_buf(), cache);
        }
        self.caches
            .get(path)
            .ok_or_else(|| TrellisError::MissingResource(path.display().to_string()))
    }

    fn load_model(&self, path: &Path) -> ModelCache {
        let start = Instant::now();
        let model_path = self.settings.model_dir.join(path);

        let loaded = self.loaders.probe_and_load(&model_path).and_then(|result| {
            let result = result.ok_or_else(|| TrellisError::NoModelLoader(model_path.clone()))?;
            let model = result
                .model
                .ok_or_else(|| TrellisError::NoModel(model_path.clone()))?;
            log::info!("Model metadata: {:?}", result.metadata);
            let scene = SceneReconstructor::reconstruct(&model, &self.settings)?;
            Ok(ModelCache::Loaded {
                scene: scene.into_shared(),
                metadata: result.metadata,
                animations: result.animations.into(),
            })
        });

        match loaded {
            Ok(cache) => {
                log::info!(
                    "Model {} loaded, duration: {:?}",
                    path.display(),
                    start.elapsed()
                );
                cache
            }
            Err(err) => {
                log::warn!("Model {} load failed: {err}", path.display());
                ModelCache::Failed
            }
        }
    }

    fn release_all(&mut self) -> Result<()> {
        let mut released = Ok(());
        for (_, item) in self.items.drain() {
            released = released.and(item.release());
        }
        for (_, cache) in self.caches.drain() {
            if let ModelCache::Loaded { scene, .. } = cache {
                released = released.and(scene.decrease_reference_count().map(|_| ()));
            }
        }
        released
    }
}

impl Drop for ModelInstanceManager {
    fn drop(&mut self) {
        if let Err(err) = self.release_all() {
            log::warn!("Failed to release managed models: {err}");
        }
    }
}

impl std::fmt::Debug for ModelInstanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInstanceManager")
            .field("models", &self.caches.len())
            .field("items", &self.items.len())
            .field("pinned", &self.pinned.len())
            .finish()
    }
}
