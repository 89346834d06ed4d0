//! Thin wrappers over the OS virtual-memory interface.
//!
//! Every operation surfaces the OS failure through
//! [`MemoryError::Os`] instead of aborting, so callers decide whether
//! a mapping failure is fatal. Addresses handed back are always page
//! aligned, hence word aligned.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::ptr;

use tracing::trace;

use crate::error::MemoryError;
use crate::word::{Address, Size};

pub struct VirtualMemory;

impl VirtualMemory {
    /// The OS page size.
    pub fn page_size() -> Size {
        // _SC_PAGESIZE cannot fail on any supported platform.
        Size(unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize)
    }

    /// Reserves `size` bytes of address space without backing store.
    /// The pages are inaccessible until [`unprotect_page`] or a fresh
    /// mapping makes them so.
    ///
    /// [`unprotect_page`]: Self::unprotect_page
    pub fn reserve(size: Size) -> Result<Address, MemoryError> {
        let address = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size.as_usize(),
                libc::PROT_NONE,
                libc::MAP_ANONYMOUS | libc::MAP_PRIVATE | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if address == libc::MAP_FAILED {
            return Err(MemoryError::os("mmap (reserve)"));
        }
        trace!(address = %Address(address as usize), size = %size, "reserved address space");
        Ok(Address(address as usize))
    }

    /// Maps `size` bytes of zero-filled, readable and writable memory.
    pub fn allocate(size: Size) -> Result<Address, MemoryError> {
        let address = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size.as_usize(),
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_ANONYMOUS | libc::MAP_PRIVATE,
                -1,
                0,
            )
        };
        if address == libc::MAP_FAILED {
            return Err(MemoryError::os("mmap (allocate)"));
        }
        trace!(address = %Address(address as usize), size = %size, "allocated memory");
        Ok(Address(address as usize))
    }

    /// Maps the first `size` bytes of `file` read-only.
    pub fn map_file(file: &File, size: Size) -> Result<Address, MemoryError> {
        let address = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size.as_usize(),
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        };
        if address == libc::MAP_FAILED {
            return Err(MemoryError::os("mmap (file)"));
        }
        Ok(Address(address as usize))
    }

    /// Unmaps `[address, address + size)`.
    ///
    /// # Safety
    ///
    /// The range must be a mapping obtained from this module that no
    /// live reference points into.
    pub unsafe fn release(address: Address, size: Size) -> Result<(), MemoryError> {
        if unsafe { libc::munmap(address.as_mut_ptr(), size.as_usize()) } != 0 {
            return Err(MemoryError::os("munmap"));
        }
        trace!(address = %address, size = %size, "released memory");
        Ok(())
    }

    /// Makes the page at `address` inaccessible. Used to plant guard
    /// pages at region boundaries.
    ///
    /// # Safety
    ///
    /// `address` must be a page-aligned address inside a mapping
    /// obtained from this module, and nothing may be reading or
    /// writing the page.
    pub unsafe fn protect_page(address: Address) -> Result<(), MemoryError> {
        let page = Self::page_size();
        debug_assert!(address.is_aligned_to(page.as_usize()));
        if unsafe { libc::mprotect(address.as_mut_ptr(), page.as_usize(), libc::PROT_NONE) } != 0 {
            return Err(MemoryError::os("mprotect (protect)"));
        }
        Ok(())
    }

    /// Restores read/write access to the page at `address`.
    ///
    /// # Safety
    ///
    /// As [`protect_page`](Self::protect_page).
    pub unsafe fn unprotect_page(address: Address) -> Result<(), MemoryError> {
        let page = Self::page_size();
        debug_assert!(address.is_aligned_to(page.as_usize()));
        let prot = libc::PROT_READ | libc::PROT_WRITE;
        if unsafe { libc::mprotect(address.as_mut_ptr(), page.as_usize(), prot) } != 0 {
            return Err(MemoryError::os("mprotect (unprotect)"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn page_size_is_a_power_of_two() {
        let page = VirtualMemory::page_size();
        assert!(page.as_usize().is_power_of_two());
        assert!(page.is_word_aligned());
    }

    #[test]
    fn allocate_release_round_trip() {
        let page = VirtualMemory::page_size();
        let address = VirtualMemory::allocate(page).unwrap();
        assert!(address.is_aligned_to(page.as_usize()));
        unsafe {
            // Fresh anonymous pages are zero filled and writable.
            assert_eq!(address.as_ptr::<usize>().read(), 0);
            address.as_mut_ptr::<usize>().write(0xfeed);
            assert_eq!(address.as_ptr::<usize>().read(), 0xfeed);
            VirtualMemory::release(address, page).unwrap();
        }
    }

    #[test]
    fn reserve_then_unprotect_makes_pages_usable() {
        let page = VirtualMemory::page_size();
        let address = VirtualMemory::reserve(page).unwrap();
        unsafe {
            VirtualMemory::unprotect_page(address).unwrap();
            address.as_mut_ptr::<u8>().write(42);
            assert_eq!(address.as_ptr::<u8>().read(), 42);
            VirtualMemory::protect_page(address).unwrap();
            VirtualMemory::release(address, page).unwrap();
        }
    }

    #[test]
    fn map_file_sees_the_file_contents() {
        let mut file = tempfile::tempfile().unwrap();
        let page = VirtualMemory::page_size();
        file.write_all(&vec![7u8; page.as_usize()]).unwrap();
        file.flush().unwrap();

        let address = VirtualMemory::map_file(&file, page).unwrap();
        unsafe {
            assert_eq!(address.as_ptr::<u8>().read(), 7);
            assert_eq!((address + page.as_usize() - 1).as_ptr::<u8>().read(), 7);
            VirtualMemory::release(address, page).unwrap();
        }
    }
}
