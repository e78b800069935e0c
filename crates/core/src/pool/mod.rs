//! Reusable heavyweight buffers for the frame pipeline.

use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{CatalogError, Result};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Buffers that can be returned to a defined zero state and reused.
pub trait Reusable {
    /// Restores the zero state without giving up the allocation.
    fn reset(&mut self);

    /// Frees whatever the buffer holds; called once when the pool drains.
    fn release_resources(&mut self) {}
}

/// RGBA frame or working image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl FrameBuffer {
    pub const CHANNELS: usize = 4;

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * Self::CHANNELS],
        }
    }

    /// Resizes to the requested dimensions, keeping the allocation when it is
    /// already large enough.
    pub fn ensure_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels
            .resize(width as usize * height as usize * Self::CHANNELS, 0);
    }

    pub fn is_zeroed(&self) -> bool {
        self.pixels.iter().all(|byte| *byte == 0)
    }
}

impl Reusable for FrameBuffer {
    fn reset(&mut self) {
        self.pixels.fill(0);
    }

    fn release_resources(&mut self) {
        self.pixels = Vec::new();
        self.width = 0;
        self.height = 0;
    }
}

/// A buffer checked out of a [`BufferPool`]. It must be handed back through
/// [`BufferPool::release`]; dropping it simply loses the buffer.
pub struct Pooled<T> {
    pool: u64,
    id: u64,
    inner: T,
}

impl<T> Pooled<T> {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("pool", &self.pool)
            .field("id", &self.id)
            .field("inner", &self.inner)
            .finish()
    }
}

/// Unbounded free-list of reusable buffers.
///
/// The pool takes `&mut self` everywhere and does no locking: all checkouts
/// are expected to come from the single frame pipeline. Hosts that process
/// frames in parallel must wrap the pool in a mutex.
pub struct BufferPool<T> {
    id: u64,
    factory: Box<dyn Fn() -> T>,
    free: Vec<Pooled<T>>,
    checked_out: HashSet<u64>,
    next_buffer: u64,
}

impl<T: Reusable + Default + 'static> BufferPool<T> {
    pub fn new() -> Self {
        Self::with_factory(T::default)
    }
}

impl<T: Reusable + Default + 'static> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reusable> BufferPool<T> {
    pub fn with_factory(factory: impl Fn() -> T + 'static) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            factory: Box::new(factory),
            free: Vec::new(),
            checked_out: HashSet::new(),
            next_buffer: 0,
        }
    }

    /// Hands out a zeroed buffer, reusing a pooled one when available.
    pub fn acquire(&mut self) -> Pooled<T> {
        let buffer = match self.free.pop() {
            Some(mut buffer) => {
                buffer.inner.reset();
                buffer
            }
            None => {
                let id = self.next_buffer;
                self.next_buffer += 1;
                tracing::debug!(pool = self.id, buffer = id, "allocating pooled buffer");
                Pooled {
                    pool: self.id,
                    id,
                    inner: (self.factory)(),
                }
            }
        };
        self.checked_out.insert(buffer.id);
        buffer
    }

    /// Resets the buffer and puts it back on the free-list.
    pub fn release(&mut self, mut buffer: Pooled<T>) -> Result<()> {
        if buffer.pool != self.id || !self.checked_out.remove(&buffer.id) {
            return Err(CatalogError::InvalidHandle {
                pool: buffer.pool,
                id: buffer.id,
            });
        }
        buffer.inner.reset();
        self.free.push(buffer);
        Ok(())
    }

    /// Frees every pooled buffer. Buffers still checked out are unaffected
    /// and will be rejected if released afterwards.
    pub fn drain(&mut self) -> usize {
        let drained = self.free.len();
        for mut buffer in self.free.drain(..) {
            buffer.inner.release_resources();
        }
        self.checked_out.clear();
        drained
    }

    /// Number of buffers ever allocated by this pool.
    pub fn allocated(&self) -> u64 {
        self.next_buffer
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn checked_out(&self) -> usize {
        self.checked_out.len()
    }
}

impl<T> fmt::Debug for BufferPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("id", &self.id)
            .field("free", &self.free.len())
            .field("checked_out", &self.checked_out.len())
            .field("allocated", &self.next_buffer)
            .finish()
    }
}
