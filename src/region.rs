use std::{alloc::Layout, fmt, marker::PhantomData, ptr::{self, NonNull}};

use crate::{
    backend::{Acquired, Backend, DefaultBackend},
    error::AllocError,
    list::Node,
    utils::{align, checked_alignment},
};

/// Descriptor of a region: the bookkeeping for one contiguous block.
///
/// It is always stored as a [`Node<RegionHeader>`] in memory acquired from the
/// region's own backend, right beside the block it describes (not inside it):
///
/// ```text
///   descriptor (Node<RegionHeader>)             block (block_size bytes)
/// +-------------------------------+        +----------------------------------------+
/// | next -> following region      |        | A1 | pad | A2 |  A3  |     free        |
/// | block ------------------------|------> +----------------------------------------+
/// | block_size                    |        ^                      ^                 ^
/// | offset (bump cursor)          |      block          block + offset     block + block_size
/// | backend                       |
/// +-------------------------------+
/// ```
///
/// The cursor is kept as an offset from the block start so that every bump is
/// plain checked integer arithmetic; the invariant is `offset <= block_size`.
pub(crate) struct RegionHeader<B: Backend> {
    block: NonNull<u8>,
    block_size: usize,
    offset: usize,
    backend: B,
}

pub(crate) type RegionNode<B> = Node<RegionHeader<B>>;

impl<B: Backend> RegionHeader<B> {
    /// Layout of the descriptor as requested from the backend.
    pub(crate) const DESCRIPTOR: Layout = Layout::new::<RegionNode<B>>();

    /// Acquires a descriptor and a block of exactly `block_size` bytes and
    /// writes the descriptor. Nothing is kept if either acquisition fails.
    pub(crate) fn create(backend: B, block_size: usize) -> Result<NonNull<RegionNode<B>>, AllocError> {
        let Acquired { descriptor, block } = backend.acquire(Self::DESCRIPTOR, block_size)?;
        let node = descriptor.cast::<RegionNode<B>>();

        unsafe {
            node.as_ptr().write(Node {
                next: None,
                data: RegionHeader {
                    block,
                    block_size,
                    offset: 0,
                    backend,
                },
            });
        }

        Ok(node)
    }

    /// Gives the block and the descriptor back to the backend.
    ///
    /// **SAFETY**: `node` must come from [`RegionHeader::create`], must not be
    /// linked into a list anymore, and is dangling afterwards.
    pub(crate) unsafe fn destroy(node: NonNull<RegionNode<B>>) {
        unsafe {
            let header = ptr::read(&node.as_ref().data);
            let acquired = Acquired { descriptor: node.cast(), block: header.block };

            header.backend.release(acquired, Self::DESCRIPTOR, header.block_size);
        }
    }

    #[inline]
    pub(crate) fn start(&self) -> usize {
        self.block.as_ptr() as usize
    }

    #[inline]
    pub(crate) fn end(&self) -> usize {
        self.start() + self.block_size
    }

    #[inline]
    pub(crate) fn block_size(&self) -> usize {
        self.block_size
    }

    /// Bytes between the block start and the cursor, alignment padding included.
    #[inline]
    pub(crate) fn used(&self) -> usize {
        self.offset
    }

    /// Rewinds the cursor to the block start.
    #[inline]
    pub(crate) fn reset(&mut self) {
        self.offset = 0;
    }

    /// Bytes from the cursor to the end of the block.
    #[inline]
    pub(crate) fn available(&self) -> usize {
        self.block_size.saturating_sub(self.offset)
    }

    /// Bytes from the cursor, once aligned to `alignment`, to the end of the block.
    pub(crate) fn available_alignment(&self, alignment: usize) -> usize {
        let alignment = checked_alignment(alignment);
        let end = self.end();

        match align(self.start() + self.offset, alignment) {
            Some(start) if start < end => end - start,
            _ => 0,
        }
    }

    /// Bumps the cursor past an `alignment` aligned range of `size` bytes.
    ///
    /// Returns `None` (and leaves the cursor untouched) when `size` is zero or
    /// when the range does not fit. On success `size` is added to `used`.
    pub(crate) fn alloc_align(
        &mut self,
        alignment: usize,
        size: usize,
        used: Option<&mut usize>,
    ) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }

        let alignment = checked_alignment(alignment);
        let start = align(self.start() + self.offset, alignment)?;
        let end = start.checked_add(size)?;

        if end > self.end() {
            return None;
        }

        if let Some(used) = used {
            *used += size;
        }

        let chunk_start = start - self.start();
        self.offset = end - self.start();

        // Derived from `block` so the returned pointer keeps its provenance.
        NonNull::new(unsafe { self.block.as_ptr().add(chunk_start) })
    }

    /// [`RegionHeader::alloc_align`] followed by zeroing the range.
    pub(crate) fn calloc_align(&mut self, alignment: usize, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.alloc_align(alignment, size, None)?;

        unsafe { ptr.as_ptr().write_bytes(0, size) };

        Some(ptr)
    }

    /// Grow-only reallocation, see [`Region::realloc_align`].
    pub(crate) unsafe fn realloc_align(
        &mut self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        alignment: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        let Some(ptr) = ptr else {
            return self.alloc_align(alignment, new_size, None);
        };

        if new_size == 0 {
            return None;
        }

        if new_size <= old_size {
            return Some(ptr);
        }

        let new_ptr = self.alloc_align(alignment, new_size, None)?;

        // `ptr` may be a stale range the cursor has been rewound over, so the
        // two ranges can overlap.
        unsafe { ptr::copy(ptr.as_ptr(), new_ptr.as_ptr(), old_size) };

        Some(new_ptr)
    }
}

/// One contiguous block of memory plus a bump cursor.
///
/// This is the unit a [`Backend`] acquires and releases. A region owns its
/// block exclusively and gives it back when dropped. Allocations are never
/// freed one by one: the cursor only moves forward until [`Region::reset`]
/// rewinds it.
///
/// Pointers handed out are non-owning views into the block. They stay valid
/// until the region is dropped, but the bytes behind them are overwritten by
/// later allocations once the cursor has been rewound past them.
pub struct Region<B: Backend = DefaultBackend> {
    node: NonNull<RegionNode<B>>,
    marker: PhantomData<RegionNode<B>>,
}

impl Region<DefaultBackend> {
    /// Creates a region of `size` bytes on the build-time [`DefaultBackend`].
    pub fn new(size: usize) -> Result<Self, AllocError> {
        Self::create(DefaultBackend::default(), size)
    }
}

impl<B: Backend> Region<B> {
    /// Acquires a block of exactly `size` bytes from `backend`. Rounding to
    /// pages is left to the caller (an [`crate::Arena`] does it).
    ///
    /// Two acquisitions happen (descriptor and block); if either fails the
    /// other is released and the error is returned.
    pub fn create(backend: B, size: usize) -> Result<Self, AllocError> {
        let node = RegionHeader::create(backend, size)?;

        Ok(Self { node, marker: PhantomData })
    }

    #[inline]
    fn header(&self) -> &RegionHeader<B> {
        unsafe { &self.node.as_ref().data }
    }

    #[inline]
    fn header_mut(&mut self) -> &mut RegionHeader<B> {
        unsafe { &mut self.node.as_mut().data }
    }

    /// Length of the block.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.header().block_size()
    }

    /// Bytes consumed so far, alignment padding included.
    #[inline]
    pub fn used(&self) -> usize {
        self.header().used()
    }

    /// Bytes left between the cursor and the end of the block.
    #[inline]
    pub fn available(&self) -> usize {
        self.header().available()
    }

    /// Bytes left once the cursor is aligned to `alignment`.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is neither zero nor a power of two.
    #[inline]
    pub fn available_alignment(&self, alignment: usize) -> usize {
        self.header().available_alignment(alignment)
    }

    /// Rewinds the cursor to the start of the block. Every pointer handed out
    /// so far may be overwritten by the next allocations.
    #[inline]
    pub fn reset(&mut self) {
        self.header_mut().reset();
    }

    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// Returns `None` for `size == 0` or when the block has no room left; in
    /// both cases nothing changes. An `alignment` of zero means unaligned.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is neither zero nor a power of two.
    #[inline]
    pub fn alloc_align(&mut self, alignment: usize, size: usize) -> Option<NonNull<u8>> {
        self.header_mut().alloc_align(alignment, size, None)
    }

    /// Same as [`Region::alloc_align`], adding `size` to `total` on success.
    #[inline]
    pub fn alloc_align_tracked(&mut self, alignment: usize, size: usize, total: &mut usize) -> Option<NonNull<u8>> {
        self.header_mut().alloc_align(alignment, size, Some(total))
    }

    /// Same as [`Region::alloc_align`], with the range zeroed.
    #[inline]
    pub fn calloc_align(&mut self, alignment: usize, size: usize) -> Option<NonNull<u8>> {
        self.header_mut().calloc_align(alignment, size)
    }

    /// Grow-only reallocation.
    ///
    /// - `ptr == None` behaves as [`Region::alloc_align`] of `new_size`.
    /// - `new_size == 0` returns `None`.
    /// - `new_size <= old_size` returns `ptr` unchanged; the tail is abandoned.
    /// - otherwise a fresh range is allocated and the first `old_size` bytes of
    ///   `ptr` are copied into it. The old range is not reclaimed.
    ///
    /// # Safety
    ///
    /// When growing, `ptr` must be valid for reads of `old_size` bytes.
    #[inline]
    pub unsafe fn realloc_align(
        &mut self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        alignment: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        unsafe { self.header_mut().realloc_align(ptr, old_size, alignment, new_size) }
    }
}

impl<B: Backend> Drop for Region<B> {
    fn drop(&mut self) {
        unsafe { RegionHeader::destroy(self.node) }
    }
}

impl<B: Backend> fmt::Debug for Region<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("block", &self.header().block)
            .field("block_size", &self.block_size())
            .field("used", &self.used())
            .finish()
    }
}
