use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;
use parking_lot::{RwLock, RwLockReadGuard};

// Global buffer id generator
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// CPU-side copy of a GPU buffer.
///
/// Vertex, index and storage data all live here until the host uploads them;
/// the version counter tells the host when its copy is out of date.
#[derive(Debug)]
pub struct DataBuffer {
    pub id: u64,
    pub label: String,
    version: AtomicU64,
    data: RwLock<Vec<u8>>,
    pub usage: wgpu::BufferUsages,
}

/// Cheap, clonable handle to a [`DataBuffer`]. Identity is the buffer id.
#[derive(Debug, Clone)]
pub struct BufferRef(Arc<DataBuffer>);

impl PartialEq for BufferRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for BufferRef {}

impl std::hash::Hash for BufferRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl BufferRef {
    pub fn new<T: Pod>(data: &[T], usage: wgpu::BufferUsages, label: Option<&str>) -> Self {
        Self::from_bytes(bytemuck::cast_slice(data), usage, label)
    }

    pub fn from_bytes(data: &[u8], usage: wgpu::BufferUsages, label: Option<&str>) -> Self {
        Self(Arc::new(DataBuffer {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            label: label.unwrap_or("Buffer").to_string(),
            version: AtomicU64::new(0),
            data: RwLock::new(data.to_vec()),
            usage,
        }))
    }

    pub fn new_with_capacity(
        capacity: usize,
        usage: wgpu::BufferUsages,
        label: Option<&str>,
    ) -> Self {
        Self::from_bytes(&vec![0u8; capacity], usage, label)
    }

    /// Lock-free read of the data version.
    pub fn version(&self) -> u64 {
        self.0.version.load(Ordering::Acquire)
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn usage(&self) -> wgpu::BufferUsages {
        self.0.usage
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    /// Size of the current contents in bytes.
    pub fn size(&self) -> u64 {
        self.0.data.read().len() as u64
    }

    /// Replaces the contents and bumps the version.
    pub fn update<T: Pod>(&self, data: &[T]) {
        self.update_bytes(bytemuck::cast_slice(data));
    }

    pub fn update_bytes(&self, data: &[u8]) {
        {
            let mut inner = self.0.data.write();
            if inner.len() != data.len() {
                log::debug!(
                    "Buffer {} resized: {} -> {} bytes",
                    self.0.label,
                    inner.len(),
                    data.len()
                );
            }
            inner.clear();
            inner.extend_from_slice(data);
        }
        self.0.version.fetch_add(1, Ordering::Release);
    }

    pub fn read_data(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.0.data.read()
    }

    /// The whole buffer as a slice.
    #[must_use]
    pub fn as_slice(&self) -> BufferSlice {
        BufferSlice {
            buffer: self.clone(),
            offset: 0,
            size: self.size(),
        }
    }

    /// A byte range of the buffer. The range is clamped to the current size.
    #[must_use]
    pub fn slice(&self, range: Range<u64>) -> BufferSlice {
        let size = self.size();
        let start = range.start.min(size);
        let end = range.end.clamp(start, size);
        BufferSlice {
            buffer: self.clone(),
            offset: start,
            size: end - start,
        }
    }
}

impl std::ops::Deref for BufferRef {
    type Target = DataBuffer;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A byte range of a buffer, as bound to a shader slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferSlice {
    pub buffer: BufferRef,
    pub offset: u64,
    pub size: u64,
}

impl BufferSlice {
    #[inline]
    #[must_use]
    pub fn buffer_id(&self) -> u64 {
        self.buffer.id()
    }

    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<u64> {
        self.offset..self.offset + self.size
    }
}
