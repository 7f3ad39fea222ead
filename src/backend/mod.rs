//! Sources of raw memory for regions.
//!
//! A [`Backend`] hands out two kinds of ranges: the small descriptor a region
//! keeps its bookkeeping in, and the data block allocations are bumped out of.
//! Most backends serve both from the same place; the virtual memory ones map
//! the block and take the descriptor from the process heap.
//!
//! Which backend an `Arena::new()` uses is decided at build time (see
//! [`DefaultBackend`]). Any other implementation can be handed to
//! [`crate::Arena::with_backend`].

use std::{alloc::Layout, cmp, ptr::{self, NonNull}, rc::Rc};

use crate::error::AllocError;

mod callback;
mod heap;
mod os;

#[cfg(test)]
pub(crate) mod testing;

pub use callback::{AllocFn, CallbackBackend, DeallocFn, ReallocFn};
pub use heap::HeapBackend;
#[cfg(unix)]
pub use os::MmapBackend;
#[cfg(windows)]
pub use os::VirtualAllocBackend;

/// Backend picked by the `backend-mmap` feature on unix targets.
#[cfg(all(unix, feature = "backend-mmap"))]
pub type DefaultBackend = MmapBackend;

/// Backend picked by the `backend-virtualalloc` feature on windows targets.
#[cfg(all(windows, feature = "backend-virtualalloc", not(all(unix, feature = "backend-mmap"))))]
pub type DefaultBackend = VirtualAllocBackend;

/// Process heap, used when no virtual memory backend was selected.
#[cfg(not(any(
    all(unix, feature = "backend-mmap"),
    all(windows, feature = "backend-virtualalloc")
)))]
pub type DefaultBackend = HeapBackend;

/// Memory handed out by [`Backend::acquire`]: the descriptor and the block of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired {
    pub descriptor: NonNull<u8>,
    pub block: NonNull<u8>,
}

/// Capability set every memory source provides.
///
/// The backend value itself is the context: whatever state `alloc` and
/// `dealloc` need lives in `self`.
///
/// # Safety
///
/// A range returned by [`Backend::alloc`] or [`Backend::alloc_descriptor`] must
/// be valid for reads and writes of `size` bytes and must not be handed out
/// again until it was returned through the matching `dealloc` call with the
/// same `size`. Clones of a backend (and references to it) must be able to
/// release each other's ranges.
pub unsafe trait Backend {
    /// Acquires `size` bytes, or `None` when the backend is exhausted.
    fn alloc(&self, size: usize) -> Option<NonNull<u8>>;

    /// Releases a range previously returned by [`Backend::alloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc` on this backend (or a clone of it) with
    /// exactly `size` bytes and must not be used afterwards.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize);

    /// Resizes a range, moving its contents. Regions and arenas never call
    /// this; it is here for callers who use a backend directly.
    ///
    /// # Safety
    ///
    /// Same contract as [`Backend::dealloc`] for `ptr` and `old_size`.
    unsafe fn realloc(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        let new_ptr = self.alloc(new_size)?;

        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), cmp::min(old_size, new_size));
            self.dealloc(ptr, old_size);
        }

        Some(new_ptr)
    }

    /// Acquires memory for a region descriptor.
    fn alloc_descriptor(&self, size: usize) -> Option<NonNull<u8>> {
        self.alloc(size)
    }

    /// Releases a range returned by [`Backend::alloc_descriptor`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Backend::dealloc`].
    unsafe fn dealloc_descriptor(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { self.dealloc(ptr, size) }
    }

    /// Acquires a descriptor laid out as `descriptor` plus a block of
    /// `block_size` bytes.
    ///
    /// Either both acquisitions succeed or neither is kept: if the second one
    /// fails, the first is released before the error is returned.
    fn acquire(&self, descriptor: Layout, block_size: usize) -> Result<Acquired, AllocError> {
        let header = self
            .alloc_descriptor(descriptor.size())
            .ok_or(AllocError::BackendExhausted { size: descriptor.size() })?;

        if header.as_ptr() as usize % descriptor.align() != 0 {
            unsafe { self.dealloc_descriptor(header, descriptor.size()) };
            return Err(AllocError::MisalignedDescriptor { align: descriptor.align() });
        }

        let Some(block) = self.alloc(block_size) else {
            unsafe { self.dealloc_descriptor(header, descriptor.size()) };
            return Err(AllocError::BackendExhausted { size: block_size });
        };

        Ok(Acquired { descriptor: header, block })
    }

    /// Gives back both halves of an [`Acquired`] pair, block first.
    ///
    /// # Safety
    ///
    /// `acquired` must come from [`Backend::acquire`] on this backend with the
    /// same `descriptor` and `block_size`, and must not be used afterwards.
    unsafe fn release(&self, acquired: Acquired, descriptor: Layout, block_size: usize) {
        unsafe {
            self.dealloc(acquired.block, block_size);
            self.dealloc_descriptor(acquired.descriptor, descriptor.size());
        }
    }
}

unsafe impl<T: Backend + ?Sized> Backend for &T {
    #[inline]
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).alloc(size)
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { (**self).dealloc(ptr, size) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        unsafe { (**self).realloc(ptr, old_size, new_size) }
    }

    #[inline]
    fn alloc_descriptor(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).alloc_descriptor(size)
    }

    #[inline]
    unsafe fn dealloc_descriptor(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { (**self).dealloc_descriptor(ptr, size) }
    }
}

unsafe impl<T: Backend + ?Sized> Backend for Rc<T> {
    #[inline]
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).alloc(size)
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { (**self).dealloc(ptr, size) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        unsafe { (**self).realloc(ptr, old_size, new_size) }
    }

    #[inline]
    fn alloc_descriptor(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).alloc_descriptor(size)
    }

    #[inline]
    unsafe fn dealloc_descriptor(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { (**self).dealloc_descriptor(ptr, size) }
    }
}
