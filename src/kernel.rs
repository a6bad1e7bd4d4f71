use std::{ptr::NonNull, slice, sync::OnceLock};

use tracing::debug;

use crate::{
    error::{HeapError, HeapResult},
    utils::align,
};

/// Virtual memory page size of the computer. This is usually 4096, but we
/// only know it at runtime.
static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// Zero-sized handle to the operating system. Platform specific code lives
/// in the `unix` and `windows` modules below.
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. The heap itself only cares about getting a block of bytes
/// and giving it back, not about the concrete APIs offered by each kernel.
trait PlatformMemory {
    /// Request a memory region of size `len`. It returns a pointer to the
    /// given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the kernel.
    unsafe fn return_memory(addr: *mut u8, len: usize);

    /// Returns the virtual memory page size of the computer in bytes.
    unsafe fn page_size() -> usize;
}

/// Wrapper to calculate the computer's page size once.
#[inline]
pub(crate) fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(|| unsafe { Kernel::page_size() })
}

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::{
        os::raw::{c_int, c_void},
        ptr::NonNull,
    };

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

                if addr == libc::MAP_FAILED {
                    return None;
                }

                NonNull::new(addr.cast::<u8>())
            }
        }

        unsafe fn return_memory(addr: *mut u8, len: usize) {
            unsafe {
                munmap(addr as *mut c_void, len as size_t);
            }
        }

        unsafe fn page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use super::{Kernel, PlatformMemory};

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: *mut u8, _len: usize) {
            unsafe {
                let _ = Memory::VirtualFree(addr as *mut c_void, 0, Memory::MEM_RELEASE);
            }
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

/// The bytes every chunk offset points into.
///
/// The region is requested from the kernel in whole pages, so the mapping
/// may be a bit bigger than `len`, but only the first `len` bytes are ever
/// handed out. Anonymous mappings come zeroed from the kernel.
///
/// ```text
///   base                        base + len     base + mapped
///    |                              |               |
///    v                              v               v
///    +------------------------------+---------------+
///    |        addressable arena     |  page slack   |
///    +------------------------------+---------------+
/// ```
pub(crate) struct Arena {
    base: NonNull<u8>,
    len: usize,
    mapped: usize,
}

// The arena exclusively owns its mapping; nothing else holds the pointer.
unsafe impl Send for Arena {}

impl Arena {
    /// Maps a new arena of `len` bytes.
    pub(crate) fn new(len: usize) -> HeapResult<Self> {
        let mapped =
            align(len, page_size()).ok_or(HeapError::ArenaUnavailable { size: len })?;

        let base = unsafe { Kernel::request_memory(mapped) }
            .ok_or(HeapError::ArenaUnavailable { size: mapped })?;

        debug!(len, mapped, "mapped arena");

        Ok(Self { base, len, mapped })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Bytes `[start, start + size)` of the arena.
    ///
    /// Panics if the range is not inside the arena; the heap only calls
    /// this with ranges of live chunks.
    pub(crate) fn slice(&self, start: usize, size: usize) -> &[u8] {
        self.check_range(start, size);

        // SAFETY: the range is inside the mapping and `&self` keeps it alive.
        unsafe { slice::from_raw_parts(self.base.as_ptr().add(start), size) }
    }

    /// Mutable version of [`Arena::slice`].
    pub(crate) fn slice_mut(&mut self, start: usize, size: usize) -> &mut [u8] {
        self.check_range(start, size);

        // SAFETY: the range is inside the mapping and `&mut self` makes the
        // returned slice the only access to it.
        unsafe { slice::from_raw_parts_mut(self.base.as_ptr().add(start), size) }
    }

    #[inline]
    fn check_range(&self, start: usize, size: usize) {
        assert!(
            start.checked_add(size).is_some_and(|end| end <= self.len),
            "range [{start:#x}, +{size}) outside arena of {} bytes",
            self.len
        );
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { Kernel::return_memory(self.base.as_ptr(), self.mapped) }
    }
}
