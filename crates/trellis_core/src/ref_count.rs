//! Explicit Reference Counting
//!
//! GPU-backed objects (scenes, instances, pooled buffers) are not released by
//! `Drop` alone: every holder explicitly acquires and releases a reference,
//! and the payload is disposed on the release that brings the count to zero.
//!
//! # Design Principles
//! - One atomic word holds the whole state, so a loader completion racing a
//!   teardown on the main thread can never resurrect a disposed object
//! - The count starts at 0 and must be raised before first use
//! - Releasing below zero is an error, never a silent clamp
//! - Disposal runs exactly once, on the thread whose release reached zero
//!
//! # State Encoding
//!
//! | Raw value    | Meaning                                   |
//! |--------------|-------------------------------------------|
//! | `0`          | constructed, never acquired               |
//! | `1..CLOSED`  | live, that many holders                   |
//! | `CLOSED`     | disposed; terminal                        |

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

use crate::errors::{Result, TrellisError};

const CLOSED: u32 = u32::MAX;

/// Outcome of a successful release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Other holders remain; carries the new count.
    Retained(u32),
    /// This release reached zero. The caller must dispose the payload.
    Closed,
}

/// Atomic reference-count state shared by every counted resource.
#[derive(Debug)]
pub struct RefCounter {
    state: AtomicU32,
    resource: &'static str,
}

impl RefCounter {
    /// Creates a counter at zero. `resource` names the owner in errors and logs.
    #[must_use]
    pub const fn new(resource: &'static str) -> Self {
        Self {
            state: AtomicU32::new(0),
            resource,
        }
    }

    /// Name used in errors and log lines.
    #[inline]
    #[must_use]
    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// Increments the count, returning the new value.
    ///
    /// Fails with [`TrellisError::ResourceClosed`] once the resource has been
    /// disposed: a closed resource cannot be acquired again.
    pub fn increase(&self) -> Result<u32> {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            if current == CLOSED {
                return Err(TrellisError::ResourceClosed {
                    resource: self.resource,
                });
            }
            // Same policy as `Arc`: overflowing the count is unrecoverable.
            let next = match current.checked_add(1) {
                Some(next) if next != CLOSED => next,
                _ => panic!("reference count overflow on {}", self.resource),
            };
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Decrements the count.
    ///
    /// Returns [`Release::Closed`] exactly once over the lifetime of the
    /// counter. Releasing a counter that is at zero, or already closed, fails
    /// with [`TrellisError::ReferenceCountUnderflow`] and leaves the state
    /// untouched.
    pub fn decrease(&self) -> Result<Release> {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            if current == 0 || current == CLOSED {
                return Err(TrellisError::ReferenceCountUnderflow {
                    resource: self.resource,
                });
            }
            let next = if current == 1 { CLOSED } else { current - 1 };
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) if next == CLOSED => return Ok(Release::Closed),
                Ok(_) => return Ok(Release::Retained(next)),
                Err(actual) => current = actual,
            }
        }
    }

    /// Current number of holders. A closed counter reports 0.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        match self.state.load(Ordering::Acquire) {
            CLOSED => 0,
            n => n,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    /// Fails unless at least one holder currently owns a reference.
    pub fn check_in_use(&self) -> Result<()> {
        match self.state.load(Ordering::Acquire) {
            0 => Err(TrellisError::ResourceNotAcquired {
                resource: self.resource,
            }),
            CLOSED => Err(TrellisError::ResourceClosed {
                resource: self.resource,
            }),
            _ => Ok(()),
        }
    }
}

/// Explicit acquire/release contract shared by scenes, instances and buffers.
pub trait RefCount {
    /// Acquires one reference. Returns the new count.
    fn increase_reference_count(&self) -> Result<u32>;

    /// Releases one reference, disposing the resource when the count reaches
    /// zero. Returns the remaining count.
    fn decrease_reference_count(&self) -> Result<u32>;

    fn reference_count(&self) -> u32;

    fn is_closed(&self) -> bool;
}

type Disposer<T> = Box<dyn FnOnce(T) + Send + Sync>;

/// A payload guarded by a [`RefCounter`].
///
/// The payload is reachable through [`read`](Self::read) and
/// [`write`](Self::write) only while at least one reference is held. The
/// release that reaches zero takes the payload out and hands it to the
/// disposer (or simply drops it).
pub struct RefCounted<T> {
    counter: RefCounter,
    payload: RwLock<Option<T>>,
    disposer: Mutex<Option<Disposer<T>>>,
}

impl<T> RefCounted<T> {
    #[must_use]
    pub fn new(resource: &'static str, payload: T) -> Self {
        Self {
            counter: RefCounter::new(resource),
            payload: RwLock::new(Some(payload)),
            disposer: Mutex::new(None),
        }
    }

    /// Like [`new`](Self::new), with a callback that receives the payload on
    /// disposal.
    #[must_use]
    pub fn with_disposer(
        resource: &'static str,
        payload: T,
        disposer: impl FnOnce(T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            counter: RefCounter::new(resource),
            payload: RwLock::new(Some(payload)),
            disposer: Mutex::new(Some(Box::new(disposer))),
        }
    }

    #[inline]
    #[must_use]
    pub fn counter(&self) -> &RefCounter {
        &self.counter
    }

    /// Shared access to the payload while the resource is in use.
    pub fn read(&self) -> Result<MappedRwLockReadGuard<'_, T>> {
        self.counter.check_in_use()?;
        RwLockReadGuard::try_map(self.payload.read(), Option::as_ref).map_err(|_| {
            TrellisError::ResourceClosed {
                resource: self.counter.resource(),
            }
        })
    }

    /// Exclusive access to the payload while the resource is in use.
    pub fn write(&self) -> Result<MappedRwLockWriteGuard<'_, T>> {
        self.counter.check_in_use()?;
        RwLockWriteGuard::try_map(self.payload.write(), Option::as_mut).map_err(|_| {
            TrellisError::ResourceClosed {
                resource: self.counter.resource(),
            }
        })
    }

    fn dispose(&self) {
        let payload = self.payload.write().take();
        let disposer = self.disposer.lock().take();
        log::debug!("{} closed", self.counter.resource());
        match (payload, disposer) {
            (Some(payload), Some(disposer)) => disposer(payload),
            (Some(payload), None) => drop(payload),
            (None, _) => {}
        }
    }
}

impl<T> RefCount for RefCounted<T> {
    fn increase_reference_count(&self) -> Result<u32> {
        self.counter.increase()
    }

    fn decrease_reference_count(&self) -> Result<u32> {
        match self.counter.decrease()? {
            Release::Retained(remaining) => Ok(remaining),
            Release::Closed => {
                self.dispose();
                Ok(0)
            }
        }
    }

    #[inline]
    fn reference_count(&self) -> u32 {
        self.counter.count()
    }

    #[inline]
    fn is_closed(&self) -> bool {
        self.counter.is_closed()
    }
}

impl<T> std::fmt::Debug for RefCounted<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefCounted")
            .field("resource", &self.counter.resource())
            .field("count", &self.counter.count())
            .field("closed", &self.counter.is_closed())
            .finish()
    }
}
