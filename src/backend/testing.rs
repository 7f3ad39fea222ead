//! Instrumented backend for the unit tests of regions and arenas.

use std::{cell::{Cell, RefCell}, collections::HashMap, ptr::NonNull};

use super::{Backend, HeapBackend};

/// Heap backend that counts live ranges and can be told to start failing
/// after a given number of successful acquisitions.
#[derive(Debug, Default)]
pub(crate) struct CountingBackend {
    allocs: Cell<usize>,
    fail_after: Option<usize>,
    live: RefCell<HashMap<usize, usize>>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeeds `successes` times, then every acquisition fails.
    pub fn failing_after(successes: usize) -> Self {
        Self { fail_after: Some(successes), ..Self::default() }
    }

    /// Successful acquisitions so far.
    pub fn allocs(&self) -> usize {
        self.allocs.get()
    }

    /// Ranges acquired and not yet released.
    pub fn live(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn live_bytes(&self) -> usize {
        self.live.borrow().values().sum()
    }
}

unsafe impl Backend for CountingBackend {
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        if self.fail_after.is_some_and(|limit| self.allocs.get() >= limit) {
            return None;
        }

        let ptr = HeapBackend.alloc(size)?;
        self.allocs.set(self.allocs.get() + 1);
        self.live.borrow_mut().insert(ptr.as_ptr() as usize, size);

        Some(ptr)
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) {
        let recorded = self.live.borrow_mut().remove(&(ptr.as_ptr() as usize));
        assert_eq!(recorded, Some(size), "released a range that was never acquired with this size");

        unsafe { HeapBackend.dealloc(ptr, size) }
    }
}
