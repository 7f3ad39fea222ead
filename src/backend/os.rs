//! Backends that take region blocks straight from the kernel.
//!
//! The block comes from [`crate::kernel`] (page granular, page aligned) while
//! the small region descriptor is taken from the process heap, so every region
//! still costs two acquisitions.

#[cfg(any(unix, windows))]
use std::ptr::NonNull;

#[cfg(any(unix, windows))]
use super::{Backend, HeapBackend};
#[cfg(any(unix, windows))]
use crate::kernel;

/// Anonymous private `mmap(2)` mappings for blocks, heap for descriptors.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MmapBackend;

/// `VirtualAlloc` reserved and committed pages for blocks, heap for descriptors.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAllocBackend;

/// Both kernel backends share the exact same shape, only the platform behind
/// [`kernel::request_memory`] differs.
#[cfg(any(unix, windows))]
macro_rules! kernel_backend {
    ($name:ident) => {
        impl $name {
            #[inline]
            pub const fn new() -> Self {
                Self
            }
        }

        unsafe impl Backend for $name {
            fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
                if size == 0 {
                    return None;
                }

                unsafe { kernel::request_memory(size) }
            }

            unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) {
                unsafe { kernel::return_memory(ptr, size) }
            }

            fn alloc_descriptor(&self, size: usize) -> Option<NonNull<u8>> {
                HeapBackend.alloc(size)
            }

            unsafe fn dealloc_descriptor(&self, ptr: NonNull<u8>, size: usize) {
                unsafe { HeapBackend.dealloc(ptr, size) }
            }
        }
    };
}

#[cfg(unix)]
kernel_backend!(MmapBackend);

#[cfg(windows)]
kernel_backend!(VirtualAllocBackend);
