//! Owned byte buffers that cross the module boundary.

use std::mem::ManuallyDrop;

/// A `Vec<u8>` decomposed into raw parts.
///
/// Buffers are allocated by one side's allocator and must be reassembled by
/// that same side. The native module hands buffers to the host, which copies
/// the bytes out and returns the buffer through `tether_buffer_free`.
#[repr(C)]
#[derive(Debug)]
pub struct BufferFFI {
    /// Start of the allocation, or null for an empty buffer.
    pub ptr: *mut u8,
    /// Number of initialized bytes.
    pub len: usize,
    /// Capacity of the allocation.
    pub cap: usize,
}

impl BufferFFI {
    /// A buffer that owns nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }

    /// Leak `bytes` into a buffer.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let mut bytes = ManuallyDrop::new(bytes);
        Self {
            ptr: bytes.as_mut_ptr(),
            len: bytes.len(),
            cap: bytes.capacity(),
        }
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null() || self.len == 0
    }

    /// View the initialized bytes.
    ///
    /// # Safety
    ///
    /// `ptr`, `len` and `cap` must describe a live allocation produced by
    /// [`BufferFFI::from_vec`] that has not been freed.
    #[must_use]
    pub unsafe fn as_bytes(&self) -> &[u8] {
        if self.is_empty() {
            return &[];
        }
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Reassemble the original `Vec<u8>`.
    ///
    /// # Safety
    ///
    /// Must be called in the same module (same allocator) that produced the
    /// buffer with [`BufferFFI::from_vec`], and at most once per buffer.
    #[must_use]
    pub unsafe fn into_vec(self) -> Vec<u8> {
        if self.ptr.is_null() {
            return Vec::new();
        }
        // SAFETY: guaranteed by the caller.
        unsafe { Vec::from_raw_parts(self.ptr, self.len, self.cap) }
    }
}

impl Default for BufferFFI {
    fn default() -> Self {
        Self::empty()
    }
}
