/// Version counter used to detect stale derived data.
///
/// The owner calls [`changed`](Self::changed) on every edit; consumers
/// remember the version they last derived from and compare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Marks as modified, increments version by 1
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Gets the current version number
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether data derived at `version` still reflects the latest edit.
    #[inline]
    #[must_use]
    pub fn is_current(&self, version: Option<u64>) -> bool {
        version == Some(self.version)
    }
}
