use std::ptr::NonNull;

/// Page size assumed on targets where we have no way to ask the kernel.
pub(crate) const FALLBACK_PAGE_SIZE: usize = 4096;

/// Zero-sized handle to the operating system's virtual memory services.
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. The region and arena logic have nothing to do with the
/// concrete APIs offered by each kernel, they only see page sized ranges.
#[cfg_attr(not(any(unix, windows)), allow(dead_code))]
trait PlatformMemory {
    /// Request a memory region of size `len`. It returns a Pointer to the
    /// given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the kernel.
    unsafe fn return_memory(addr: NonNull<u8>, len: usize);

    /// Returns the virtual memory page size of the computer in bytes.
    unsafe fn page_size() -> usize;
}

/// Virtual memory page size of the computer. This is usually 4096.
///
/// Not cached: it is asked to the kernel every time a region is about to
/// be sized, which only happens when an arena grows.
#[inline]
pub fn page_size() -> usize {
    #[cfg(any(unix, windows))]
    {
        match unsafe { Kernel::page_size() } {
            0 => FALLBACK_PAGE_SIZE,
            size => size,
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        FALLBACK_PAGE_SIZE
    }
}

/// Wrapper to use [`PlatformMemory::request_memory`]
#[cfg(any(unix, windows))]
#[inline]
pub(crate) unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
    unsafe { Kernel::request_memory(len) }
}

/// Wrapper to use [`PlatformMemory::return_memory`]
#[cfg(any(unix, windows))]
#[inline]
pub(crate) unsafe fn return_memory(addr: NonNull<u8>, len: usize) {
    unsafe { Kernel::return_memory(addr, len) }
}

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::{os::raw::{c_int, c_void}, ptr::NonNull};

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                match addr {
                    libc::MAP_FAILED => None,
                    addr => NonNull::new(addr.cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, len: usize) {
            // munmap only fails for ranges we never mapped, nothing to recover.
            unsafe { munmap(addr.as_ptr().cast::<c_void>(), len as size_t); }
        }

        unsafe fn page_size() -> usize {
            let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

            if size <= 0 { 0 } else { size as usize }
        }
    }
}

#[cfg(windows)]
mod win32 {
    use std::{mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use super::{Kernel, PlatformMemory};

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            // Reserve the address range and commit it in one go.
            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, _len: usize) {
            // MEM_RELEASE requires a size of zero, the whole reservation goes.
            unsafe { let _ = Memory::VirtualFree(addr.as_ptr().cast::<c_void>(), 0, Memory::MEM_RELEASE); }
        }

        unsafe fn page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::is_power_of_two;

    #[test]
    fn page_size_is_a_power_of_two() {
        let size = page_size();

        assert!(size >= 512);
        assert!(is_power_of_two(size));
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn requested_memory_is_page_aligned_and_writable() {
        let len = page_size() * 2;

        unsafe {
            let addr = request_memory(len).expect("kernel refused two pages");
            assert_eq!(addr.as_ptr() as usize % page_size(), 0);

            addr.as_ptr().write_bytes(0xAB, len);
            assert_eq!(*addr.as_ptr().add(len - 1), 0xAB);

            return_memory(addr, len);
        }
    }
}
