//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Aligned page allocator (4.A): obtains and returns raw, page-aligned
//! memory from the OS. Two backends behind the same trait, selected by
//! Cargo feature; the pool (4.B) only ever talks to the trait.

use crate::error::{Error, Result};
use std::ptr::NonNull;

/// A raw allocation returned by a [`PageAllocator`]. `length` may exceed
/// the requested size (the `mmap` backend rounds up to a page).
pub struct Page {
    pub base: NonNull<u8>,
    pub length: usize,
}

pub trait PageAllocator: Send + Sync {
    fn alloc(&self, alignment: usize, length: usize) -> Result<Page>;
    /// # Safety
    /// `page` must have been returned by `self.alloc` and not already freed.
    unsafe fn free(&self, page: Page);
}

#[cfg(feature = "malloc")]
pub struct MallocAllocator;

#[cfg(feature = "malloc")]
impl PageAllocator for MallocAllocator {
    fn alloc(&self, alignment: usize, length: usize) -> Result<Page> {
        assert!(alignment.is_power_of_two(), "alignment must be a power of two");
        let mut ptr: *mut libc::c_void = std::ptr::null_mut();
        let rc = unsafe { libc::posix_memalign(&mut ptr, alignment, length) };
        if rc != 0 || ptr.is_null() {
            return Err(Error::allocation(format!(
                "posix_memalign({alignment}, {length}) failed: errno {rc}"
            )));
        }
        Ok(Page {
            base: NonNull::new(ptr as *mut u8).expect("posix_memalign returned null on success"),
            length,
        })
    }

    unsafe fn free(&self, page: Page) {
        unsafe { libc::free(page.base.as_ptr() as *mut libc::c_void) };
    }
}

#[cfg(feature = "mmap")]
pub struct MmapAllocator;

#[cfg(feature = "mmap")]
impl MmapAllocator {
    fn page_size() -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }
}

#[cfg(feature = "mmap")]
impl PageAllocator for MmapAllocator {
    fn alloc(&self, alignment: usize, length: usize) -> Result<Page> {
        assert!(alignment.is_power_of_two(), "alignment must be a power of two");
        let page_size = Self::page_size();
        if alignment > page_size {
            return Err(Error::allocation(format!(
                "requested alignment {alignment} exceeds page size {page_size}"
            )));
        }
        let rounded = length.div_ceil(page_size) * page_size;
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                rounded,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(Error::allocation(format!("mmap({rounded}) failed")));
        }
        Ok(Page {
            base: NonNull::new(ptr as *mut u8).expect("mmap returned null on success"),
            length: rounded,
        })
    }

    unsafe fn free(&self, page: Page) {
        unsafe {
            libc::munmap(page.base.as_ptr() as *mut libc::c_void, page.length);
        }
    }
}

/// The default backend selected by Cargo features: `mmap` unless the
/// crate is built with `--no-default-features --features malloc`.
#[cfg(feature = "mmap")]
pub fn default_allocator() -> Box<dyn PageAllocator> {
    Box::new(MmapAllocator)
}

#[cfg(all(feature = "malloc", not(feature = "mmap")))]
pub fn default_allocator() -> Box<dyn PageAllocator> {
    Box::new(MallocAllocator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_allocation() {
        let alloc = default_allocator();
        let page = alloc.alloc(64, 4096).unwrap();
        assert!(page.length >= 4096);
        unsafe { alloc.free(page) };
    }
}
