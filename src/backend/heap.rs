use std::{alloc::{self, Layout}, ptr::NonNull};

use crate::config::BACKEND_ALIGNMENT;

use super::Backend;

/// Process heap backend. Every range (descriptor and block alike) is a separate
/// [`std::alloc`] allocation aligned to [`BACKEND_ALIGNMENT`].
///
/// Zero sized requests are refused: the global allocator has no zero sized
/// allocations to give.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapBackend;

impl HeapBackend {
    #[inline]
    pub const fn new() -> Self {
        Self
    }

    #[inline]
    fn layout(size: usize) -> Option<Layout> {
        if size == 0 {
            return None;
        }

        Layout::from_size_align(size, BACKEND_ALIGNMENT).ok()
    }
}

unsafe impl Backend for HeapBackend {
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Self::layout(size)?;

        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) {
        if let Some(layout) = Self::layout(size) {
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
        }
    }

    unsafe fn realloc(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        let layout = Self::layout(old_size)?;
        // Checks that `new_size` still forms a valid layout.
        Self::layout(new_size)?;

        NonNull::new(unsafe { alloc::realloc(ptr.as_ptr(), layout, new_size) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_aligned_and_writable() {
        let backend = HeapBackend::new();

        unsafe {
            let ptr = backend.alloc(100).expect("heap allocation");
            assert_eq!(ptr.as_ptr() as usize % BACKEND_ALIGNMENT, 0);

            ptr.as_ptr().write_bytes(7, 100);
            assert_eq!(*ptr.as_ptr().add(99), 7);

            backend.dealloc(ptr, 100);
        }
    }

    #[test]
    fn zero_sized_requests_are_refused() {
        assert!(HeapBackend::new().alloc(0).is_none());
    }

    #[test]
    fn realloc_keeps_the_prefix() {
        let backend = HeapBackend::new();

        unsafe {
            let ptr = backend.alloc(4).expect("heap allocation");
            ptr.as_ptr().copy_from_nonoverlapping([1u8, 2, 3, 4].as_ptr(), 4);

            let grown = backend.realloc(ptr, 4, 4096).expect("heap reallocation");
            assert_eq!(std::slice::from_raw_parts(grown.as_ptr(), 4), &[1, 2, 3, 4]);

            backend.dealloc(grown, 4096);
        }
    }
}
