//! Model file loaders
//!
//! Parsing model files is the embedding application's business. It
//! registers one [`ModelFileLoader`] per format; [`ModelFileLoaders`] picks
//! the first loader that recognises a file and runs it.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use trellis_core::Result;
use trellis_scene::AnimationChannel;

use crate::model::{Model, ModelMetadata};

/// Bytes read from the start of a file for probing.
pub const PROBE_HEADER_LEN: usize = 64;

/// Everything a loader extracted from one file.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    pub metadata: Option<ModelMetadata>,
    /// Absent for files that hold only animations or metadata.
    pub model: Option<Model>,
    pub animations: Vec<AnimationChannel>,
}

pub trait ModelFileLoader: Send + Sync {
    fn name(&self) -> &str;

    /// Lower-case file extensions this loader handles, without the dot.
    fn extensions(&self) -> &[&str];

    /// Whether the file starts with this format's signature. Loaders whose
    /// format has no signature can keep the default.
    fn probe_header(&self, header: &[u8]) -> bool {
        let _ = header;
        false
    }

    fn load(&self, path: &Path) -> Result<LoadResult>;
}

/// Registry of file loaders, consulted in registration order.
#[derive(Clone, Default)]
pub struct ModelFileLoaders {
    loaders: Vec<Arc<dyn ModelFileLoader>>,
}

impl ModelFileLoaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, loader: impl ModelFileLoader + 'static) -> &mut Self {
        log::debug!("Registered model loader `{}`", loader.name());
        self.loaders.push(Arc::new(loader));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Finds the loader for `path`: a matching file signature wins, then a
    /// matching extension.
    pub fn probe(&self, path: &Path) -> Result<Option<Arc<dyn ModelFileLoader>>> {
        let mut header = Vec::with_capacity(PROBE_HEADER_LEN);
        File::open(path)?
            .take(PROBE_HEADER_LEN as u64)
            .read_to_end(&mut header)?;

        if let Some(loader) = self.loaders.iter().find(|loader| loader.probe_header(&header)) {
            return Ok(Some(Arc::clone(loader)));
        }

        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        Ok(extension.and_then(|extension| {
            self.loaders
                .iter()
                .find(|loader| loader.extensions().contains(&extension.as_str()))
                .cloned()
        }))
    }

    /// Probes `path` and runs the matching loader. `Ok(None)` means no
    /// registered loader recognises the file.
    pub fn probe_and_load(&self, path: &Path) -> Result<Option<LoadResult>> {
        let Some(loader) = self.probe(path)? else {
            log::debug!("No model loader for {}", path.display());
            return Ok(None);
        };
        log::debug!("Loading {} with `{}`", path.display(), loader.name());
        loader.load(path).map(Some)
    }
}

impl std::fmt::Debug for ModelFileLoaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.loaders.iter().map(|loader| loader.name()))
            .finish()
    }
}
