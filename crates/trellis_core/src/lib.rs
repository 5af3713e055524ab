//! Foundational types for Trellis: the error taxonomy, explicit reference
//! counting for GPU-backed resources, change tracking and settings.

pub mod change_tracker;
pub mod errors;
pub mod ref_count;
pub mod settings;

pub use change_tracker::ChangeTracker;
pub use errors::{BindingConflict, HierarchyDefect, Result, TrellisError};
pub use ref_count::{RefCount, RefCounted, RefCounter, Release};
pub use settings::TrellisSettings;
