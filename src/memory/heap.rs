use crate::error::{PalError, PalResult};
use std::io;
use std::ptr;

/// Default host-heap backing store.
///
/// Regions come from anonymous `mmap`, so the GPU-visible address is simply
/// the mapping address (unified addressing) and page-granular release is
/// exact.
pub fn alloc(size: usize) -> PalResult<*mut u8> {
    if size == 0 {
        return Err(PalError::AllocationExhausted {
            requested: 0,
            backing: "host heap",
        });
    }

    let ret = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if ret == libc::MAP_FAILED {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOMEM) {
            return Err(PalError::AllocationExhausted {
                requested: size,
                backing: "host heap",
            });
        }
        return Err(PalError::Io(err));
    }

    Ok(ret.cast::<u8>())
}

/// Returns a region obtained from [`alloc`].
///
/// # Safety
/// `ptr`/`size` must name exactly one live allocation produced by [`alloc`],
/// and the region must not be touched afterwards.
pub unsafe fn free(ptr: *mut u8, size: usize) {
    unsafe {
        libc::munmap(ptr.cast::<libc::c_void>(), size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_is_writable_and_freeable() {
        let ptr = alloc(4096).unwrap();
        assert!(!ptr.is_null());
        unsafe {
            ptr.write_bytes(0xA5, 4096);
            assert_eq!(*ptr.add(4095), 0xA5);
            free(ptr, 4096);
        }
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            alloc(0),
            Err(PalError::AllocationExhausted { requested: 0, .. })
        ));
    }
}
