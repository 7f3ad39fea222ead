use std::{fmt, ptr::NonNull};

use super::Backend;

/// `alloc(size, ctx)`.
pub type AllocFn<C> = fn(usize, &C) -> Option<NonNull<u8>>;
/// `dealloc(ptr, size, ctx)`.
pub type DeallocFn<C> = fn(NonNull<u8>, usize, &C);
/// `realloc(ptr, old_size, new_size, ctx)`.
pub type ReallocFn<C> = fn(NonNull<u8>, usize, usize, &C) -> Option<NonNull<u8>>;

/// A backend assembled from plain functions and an opaque context.
///
/// Useful when the memory source is described as a table of callbacks (an
/// embedding application, an FFI boundary, a test harness) rather than as a
/// type of its own. Cloning clones the context, so the context should be a
/// cheap handle (`Rc`, a reference, an index) when it carries state.
pub struct CallbackBackend<C> {
    ctx: C,
    alloc: AllocFn<C>,
    dealloc: DeallocFn<C>,
    realloc: Option<ReallocFn<C>>,
}

impl<C> CallbackBackend<C> {
    /// # Safety
    ///
    /// `alloc` and `dealloc` must uphold the [`Backend`] contract for `ctx`
    /// and every clone of it.
    pub const unsafe fn new(ctx: C, alloc: AllocFn<C>, dealloc: DeallocFn<C>) -> Self {
        Self { ctx, alloc, dealloc, realloc: None }
    }

    /// Adds a `realloc` callback. Without one, [`Backend::realloc`] falls
    /// back to alloc, copy and dealloc.
    pub fn with_realloc(mut self, realloc: ReallocFn<C>) -> Self {
        self.realloc = Some(realloc);
        self
    }

    #[inline]
    pub const fn context(&self) -> &C {
        &self.ctx
    }
}

impl<C: Clone> Clone for CallbackBackend<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            alloc: self.alloc,
            dealloc: self.dealloc,
            realloc: self.realloc,
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for CallbackBackend<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackBackend")
            .field("ctx", &self.ctx)
            .field("realloc", &self.realloc.is_some())
            .finish()
    }
}

unsafe impl<C> Backend for CallbackBackend<C> {
    #[inline]
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        (self.alloc)(size, &self.ctx)
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) {
        (self.dealloc)(ptr, size, &self.ctx)
    }

    unsafe fn realloc(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        match self.realloc {
            Some(realloc) => realloc(ptr, old_size, new_size, &self.ctx),
            None => {
                let new_ptr = self.alloc(new_size)?;

                unsafe {
                    std::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size.min(new_size));
                    self.dealloc(ptr, old_size);
                }

                Some(new_ptr)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::backend::HeapBackend;

    #[derive(Clone, Default)]
    struct Tally {
        allocs: Rc<Cell<usize>>,
        deallocs: Rc<Cell<usize>>,
        reallocs: Rc<Cell<usize>>,
    }

    fn tally_alloc(size: usize, tally: &Tally) -> Option<NonNull<u8>> {
        tally.allocs.set(tally.allocs.get() + 1);
        HeapBackend.alloc(size)
    }

    fn tally_dealloc(ptr: NonNull<u8>, size: usize, tally: &Tally) {
        tally.deallocs.set(tally.deallocs.get() + 1);
        unsafe { HeapBackend.dealloc(ptr, size) }
    }

    fn tally_realloc(ptr: NonNull<u8>, old_size: usize, new_size: usize, tally: &Tally) -> Option<NonNull<u8>> {
        tally.reallocs.set(tally.reallocs.get() + 1);
        unsafe { HeapBackend.realloc(ptr, old_size, new_size) }
    }

    #[test]
    fn callbacks_receive_the_context() {
        let backend = unsafe { CallbackBackend::new(Tally::default(), tally_alloc, tally_dealloc) };

        unsafe {
            let ptr = backend.alloc(32).expect("alloc");
            backend.dealloc(ptr, 32);
        }

        assert_eq!(backend.context().allocs.get(), 1);
        assert_eq!(backend.context().deallocs.get(), 1);
    }

    #[test]
    fn realloc_without_callback_copies() {
        let backend = unsafe { CallbackBackend::new(Tally::default(), tally_alloc, tally_dealloc) };

        unsafe {
            let ptr = backend.alloc(2).expect("alloc");
            ptr.as_ptr().write_bytes(9, 2);

            let grown = backend.realloc(ptr, 2, 64).expect("realloc");
            assert_eq!(std::slice::from_raw_parts(grown.as_ptr(), 2), &[9, 9]);
            backend.dealloc(grown, 64);
        }

        assert_eq!(backend.context().allocs.get(), 2);
        assert_eq!(backend.context().deallocs.get(), 2);
    }

    #[test]
    fn realloc_callback_is_preferred() {
        let backend = unsafe { CallbackBackend::new(Tally::default(), tally_alloc, tally_dealloc) }
            .with_realloc(tally_realloc);

        unsafe {
            let ptr = backend.alloc(16).expect("alloc");
            let grown = backend.realloc(ptr, 16, 48).expect("realloc");
            backend.dealloc(grown, 48);
        }

        assert_eq!(backend.context().reallocs.get(), 1);
        assert_eq!(backend.context().allocs.get(), 1);
    }

    #[test]
    fn clones_share_a_cloned_context() {
        let backend = unsafe { CallbackBackend::new(Tally::default(), tally_alloc, tally_dealloc) };
        let clone = backend.clone();

        unsafe {
            let ptr = clone.alloc(8).expect("alloc");
            backend.dealloc(ptr, 8);
        }

        assert_eq!(backend.context().allocs.get(), 1);
        assert_eq!(clone.context().deallocs.get(), 1);
    }
}
