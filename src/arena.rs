use std::{fmt, mem, ptr::{self, NonNull}, slice};

use tracing::{debug, trace};

use crate::{
    backend::{Backend, DefaultBackend},
    config::ArenaConfig,
    error::AllocError,
    kernel::page_size,
    list::{Link, List},
    region::{RegionHeader, RegionNode},
    report::Report,
    utils::{align, checked_alignment},
};

/// A growable chain of regions acting as one allocation pool.
///
/// ```text
///            head                                         tail
///   +------------------+     +------------------+     +------------------+
///   | Region (4 pages) | --> | Region (8 pages) | --> | Region (4 pages) | --> None
///   +------------------+     +------------------+     +------------------+
///                                    ^
///                                 current
/// ```
///
/// Allocations bump out of the `current` region. When it has no room, the
/// cursor moves forward through the chain (rewinding each region it enters)
/// and, once the chain is exhausted, a new region is appended at the tail.
/// Regions are only given back to the backend when the arena is dropped.
///
/// [`Arena::free_all`] rewinds the head only; see its documentation for how the
/// rest of the chain is reclaimed.
///
/// An arena is single threaded: it is neither `Send` nor `Sync`.
pub struct Arena<B: Backend + Clone = DefaultBackend> {
    /// Chain of regions in creation order.
    regions: List<RegionHeader<B>>,
    /// Region allocations are served from. `None` until the first region exists.
    current: Link<RegionNode<B>>,
    /// Sum of every block size ever appended.
    reserved_memory: usize,
    /// Bytes handed out since the last [`Arena::free_all`], padding excluded.
    used_memory: usize,
    config: ArenaConfig,
    backend: B,
}

impl Arena<DefaultBackend> {
    /// Creates an empty arena on the build-time [`DefaultBackend`].
    pub fn new() -> Self {
        Self::with_backend(DefaultBackend::default())
    }
}

impl Default for Arena<DefaultBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend + Clone> Arena<B> {
    /// Creates an empty arena that acquires its regions from `backend`.
    /// Nothing is acquired until the first allocation.
    pub fn with_backend(backend: B) -> Self {
        Self::with_config(backend, ArenaConfig::default())
    }

    pub fn with_config(backend: B, config: ArenaConfig) -> Self {
        Self {
            regions: List::new(),
            current: None,
            reserved_memory: 0,
            used_memory: 0,
            config,
            backend,
        }
    }

    #[inline]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sum of the block sizes of every region in the chain.
    #[inline]
    pub fn reserved_memory(&self) -> usize {
        self.reserved_memory
    }

    /// Bytes handed out since the last [`Arena::free_all`]. Alignment padding
    /// and the abandoned tails of grow-only reallocations are not counted.
    #[inline]
    pub fn used_memory(&self) -> usize {
        self.used_memory
    }

    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// `true` while no region has been acquired yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Used and reserved bytes, summed region by region.
    ///
    /// Regions past the head keep reporting their old contents after
    /// [`Arena::free_all`] until the allocation cursor enters them again.
    pub fn report(&self) -> Report {
        Report::collect(&self.regions)
    }

    /// Appends a region able to hold at least `size` bytes, rounded up to a
    /// multiple of the page size, and makes it the current one.
    ///
    /// Meant for callers who want to pre-size capacity. Use
    /// [`crate::Status::from`] to turn the result into a status code.
    pub fn append_region(&mut self, size: usize) -> Result<(), AllocError> {
        let block_size = align(size.max(1), page_size()).ok_or(AllocError::SizeOverflow { size })?;

        self.push_region(block_size)
    }

    /// Appends the region grow-on-demand needs for `size` bytes at `alignment`:
    /// enough pages for the request and its worst case padding, times the
    /// growth factor.
    fn grow(&mut self, alignment: usize, size: usize) -> Result<(), AllocError> {
        let block_size = size
            .checked_add(alignment - 1)
            .and_then(|padded| align(padded, page_size()))
            .and_then(|pages| pages.checked_mul(self.config.growth_factor()))
            .ok_or(AllocError::SizeOverflow { size })?;

        self.push_region(block_size)
    }

    fn push_region(&mut self, block_size: usize) -> Result<(), AllocError> {
        let node = RegionHeader::create(self.backend.clone(), block_size)?;

        unsafe { self.regions.append(node) };

        self.reserved_memory += block_size;
        self.current = self.regions.last();

        debug!(
            block_size,
            reserved = self.reserved_memory,
            regions = self.regions.len(),
            "appended arena region"
        );

        Ok(())
    }

    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// Walks forward from the current region to the first one with room,
    /// rewinding each region it moves into. When the end of the chain is
    /// reached a new region is appended. Returns `None` for `size == 0` (no
    /// side effects) or when the backend cannot provide a new region.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is neither zero nor a power of two.
    pub fn alloc_align(&mut self, alignment: usize, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }

        let alignment = checked_alignment(alignment);

        while let Some(mut current) = self.current {
            let region = unsafe { &mut current.as_mut().data };

            if region.available_alignment(alignment) >= size {
                return region.alloc_align(alignment, size, Some(&mut self.used_memory));
            }

            // Whatever the next region held belongs to a previous cycle.
            let next = unsafe { current.as_ref().next };

            if let Some(mut next) = next {
                unsafe { next.as_mut().data.reset() };
            }

            self.current = next;
        }

        self.grow(alignment, size).ok()?;

        let mut current = self.current?;

        unsafe { current.as_mut().data.alloc_align(alignment, size, Some(&mut self.used_memory)) }
    }

    /// [`Arena::alloc_align`] with the range zeroed.
    pub fn calloc_align(&mut self, alignment: usize, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.alloc_align(alignment, size)?;

        unsafe { ptr.as_ptr().write_bytes(0, size) };

        Some(ptr)
    }

    /// Grow-only reallocation backed by the whole chain.
    ///
    /// - `ptr == None` behaves as [`Arena::alloc_align`] of `new_size`.
    /// - `new_size == 0` returns `None`.
    /// - `new_size <= old_size` returns `ptr` unchanged.
    /// - otherwise a fresh range (possibly in a new region) receives a copy of
    ///   the first `old_size` bytes. The old range is not reclaimed.
    ///
    /// # Safety
    ///
    /// When growing, `ptr` must be valid for reads of `old_size` bytes.
    pub unsafe fn realloc_align(
        &mut self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        alignment: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        let Some(ptr) = ptr else {
            return self.alloc_align(alignment, new_size);
        };

        if new_size == 0 {
            return None;
        }

        if new_size <= old_size {
            return Some(ptr);
        }

        let new_ptr = self.alloc_align(alignment, new_size)?;

        // After `free_all` the new range may overlap a stale `ptr`.
        unsafe { ptr::copy(ptr.as_ptr(), new_ptr.as_ptr(), old_size) };

        Some(new_ptr)
    }

    /// [`Arena::alloc_align`] at the configured default alignment.
    #[inline]
    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.alloc_align(self.config.default_alignment(), size)
    }

    /// [`Arena::calloc_align`] at the configured default alignment.
    #[inline]
    pub fn calloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.calloc_align(self.config.default_alignment(), size)
    }

    /// [`Arena::realloc_align`] at the configured default alignment.
    ///
    /// # Safety
    ///
    /// Same as [`Arena::realloc_align`].
    #[inline]
    pub unsafe fn realloc(&mut self, ptr: Option<NonNull<u8>>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        unsafe { self.realloc_align(ptr, old_size, self.config.default_alignment(), new_size) }
    }

    /// Moves `value` into the arena.
    ///
    /// The value is never dropped: bulk resets and the arena's own drop only
    /// rewind cursors and release blocks.
    pub fn alloc_value<T>(&mut self, value: T) -> Option<&mut T> {
        let ptr = if mem::size_of::<T>() == 0 {
            NonNull::<T>::dangling()
        } else {
            self.alloc_align(mem::align_of::<T>(), mem::size_of::<T>())?.cast::<T>()
        };

        unsafe {
            ptr.as_ptr().write(value);
            Some(&mut *ptr.as_ptr())
        }
    }

    /// Copies `src` into the arena.
    pub fn alloc_slice_copy<T: Copy>(&mut self, src: &[T]) -> Option<&mut [T]> {
        let size = mem::size_of_val(src);

        if size == 0 {
            return Some(unsafe { slice::from_raw_parts_mut(NonNull::<T>::dangling().as_ptr(), src.len()) });
        }

        let ptr = self.alloc_align(mem::align_of::<T>(), size)?.cast::<T>();

        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            Some(slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Bulk reset.
    ///
    /// Rewinds the head region, zeroes [`Arena::used_memory`] and makes the
    /// head current again. No memory goes back to the backend.
    ///
    /// The other regions are not touched here: each one is rewound when an
    /// allocation moves the cursor into it. Until then [`Arena::report`] still
    /// counts their previous contents.
    pub fn free_all(&mut self) {
        let Some(mut head) = self.regions.first() else {
            return;
        };

        unsafe { head.as_mut().data.reset() };

        self.used_memory = 0;
        self.current = Some(head);

        trace!(reserved = self.reserved_memory, "arena reset to head region");
    }

    #[cfg(test)]
    fn blocks(&self) -> Vec<(usize, usize)> {
        self.regions.iter().map(|region| (region.start(), region.end())).collect()
    }

    #[cfg(test)]
    fn current_index(&self) -> Option<usize> {
        let current = self.current?;
        let mut node = self.regions.first();
        let mut index = 0;

        while let Some(candidate) = node {
            if candidate == current {
                return Some(index);
            }

            node = unsafe { candidate.as_ref().next };
            index += 1;
        }

        None
    }
}

impl<B: Backend + Clone> Drop for Arena<B> {
    fn drop(&mut self) {
        if !self.regions.is_empty() {
            debug!(
                regions = self.regions.len(),
                reserved = self.reserved_memory,
                "releasing arena regions"
            );
        }

        self.current = None;

        while let Some(node) = self.regions.pop_front() {
            unsafe { RegionHeader::destroy(node) };
        }
    }
}

impl<B: Backend + Clone> fmt::Debug for Arena<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("regions", &self.regions.len())
            .field("reserved_memory", &self.reserved_memory)
            .field("used_memory", &self.used_memory)
            .field("config", &self.config)
            .finish()
    }
}
