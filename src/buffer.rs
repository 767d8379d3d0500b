//! Per-core bounded buffer pools with huge-page preference and graceful
//! fallback (component B).
//!
//! Each pool backs its buffers with one contiguous region, attempted in
//! order: 1 GiB huge pages, then 2 MiB huge pages, then ordinary 4 KiB
//! pages. Whichever tier succeeds becomes the pool's backing [`Region`];
//! individual [`Buffer`] handles are fixed-size views into it, handed out
//! from a freelist. Exhausting all three tiers is fatal (§4.2).
//!
//! This mirrors the shape of a DPDK-style mempool while staying safe at
//! the handle level: [`Region`] is the only place that touches raw
//! pointers, and it hands out [`Buffer`]s whose exclusive-ownership
//! invariant is enforced by the freelist (an offset is never handed out
//! twice before being released).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::ResourceError;

/// Minimum usable data room per buffer (§4.2: "≥ 2176 bytes of data room").
pub const MIN_BUFFER_ROOM: usize = 2176;

/// Head-room reserved at the front of every buffer for cheap header
/// prepend (Ethernet + VLAN + IPv4 + TCP + options comfortably fits).
pub const HEAD_ROOM: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTier {
    Huge1G,
    Huge2M,
    Small4K,
}

impl PageTier {
    fn page_size(self) -> usize {
        match self {
            PageTier::Huge1G => 1 << 30,
            PageTier::Huge2M => 1 << 21,
            PageTier::Small4K => 1 << 12,
        }
    }
}

/// One contiguous backing allocation for a pool, at whichever tier
/// succeeded.
struct Region {
    ptr: *mut u8,
    len: usize,
    tier: PageTier,
}

// SAFETY: `Region` is only ever shared behind an `Arc`, and mutation of
// the underlying bytes happens exclusively through `Buffer` handles whose
// offsets the freelist guarantees are never aliased.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    fn reserve(tier: PageTier, len: usize) -> std::io::Result<Region> {
        cfg_if::cfg_if! {
            if #[cfg(unix)] {
                let huge_flag = match tier {
                    PageTier::Huge1G | PageTier::Huge2M => libc::MAP_HUGETLB,
                    PageTier::Small4K => 0,
                };
                let ptr = unsafe {
                    libc::mmap(
                        std::ptr::null_mut(),
                        len,
                        libc::PROT_READ | libc::PROT_WRITE,
                        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | huge_flag,
                        -1,
                        0,
                    )
                };
                if ptr == libc::MAP_FAILED {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(Region { ptr: ptr as *mut u8, len, tier })
            } else {
                // No huge-page mapping API on this platform; only the
                // Small4K tier is ever attempted here (see `reserve_tiered`).
                let _ = tier;
                let mut v = vec![0u8; len].into_boxed_slice();
                let ptr = v.as_mut_ptr();
                std::mem::forget(v);
                Ok(Region { ptr, len, tier: PageTier::Small4K })
            }
        }
    }

    /// Attempt 1 GiB, then 2 MiB, then 4 KiB pages in order, as §4.2
    /// requires. On non-unix targets the huge-page tiers are skipped
    /// (there is no portable huge-page mmap API) and only 4 KiB is tried.
    fn reserve_tiered(len: usize) -> Result<Region, ResourceError> {
        #[cfg(unix)]
        {
            for tier in [PageTier::Huge1G, PageTier::Huge2M, PageTier::Small4K] {
                match Region::reserve(tier, len) {
                    Ok(r) => return Ok(r),
                    Err(_) => continue,
                }
            }
            Err(ResourceError::BufferPoolExhausted { worker: usize::MAX })
        }
        #[cfg(not(unix))]
        {
            Region::reserve(PageTier::Small4K, len)
                .map_err(|_| ResourceError::BufferPoolExhausted { worker: usize::MAX })
        }
    }

    fn slice_mut(&self, offset: usize, len: usize) -> &mut [u8] {
        debug_assert!(offset + len <= self.len);
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(offset), len) }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        cfg_if::cfg_if! {
            if #[cfg(unix)] {
                unsafe { libc::munmap(self.ptr as *mut libc::c_void, self.len) };
            } else {
                let _ = self.tier;
                unsafe {
                    drop(Box::from_raw(std::slice::from_raw_parts_mut(self.ptr, self.len)));
                }
            }
        }
    }
}

/// A fixed-capacity byte region handed out by a [`BufferPool`].
///
/// Provides a head-room/tail-room discipline: `prepend` writes backwards
/// from the current data start, `append` writes forward from the current
/// data end, and `strip_front`/`strip_back` shrink the valid range
/// without moving bytes. Ownership is single-threaded: a `Buffer` is
/// either owned by a worker or in flight to a TX queue, never both.
pub struct Buffer {
    region: Arc<Region>,
    base: usize,
    cap: usize,
    /// Offset of the first valid data byte, relative to `base`.
    head: usize,
    /// Offset one past the last valid data byte, relative to `base`.
    tail: usize,
    /// Port this buffer was received on, or will be sent from.
    pub port: u16,
}

impl Buffer {
    fn new(region: Arc<Region>, base: usize, cap: usize) -> Self {
        Buffer {
            region,
            base,
            cap,
            head: HEAD_ROOM.min(cap),
            tail: HEAD_ROOM.min(cap),
            port: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.region.slice_mut(self.base, self.cap)[self.head..self.tail]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let h = self.head;
        let t = self.tail;
        &mut self.region.slice_mut(self.base, self.cap)[h..t]
    }

    /// Prepend `bytes` before the current data, returning `false` if
    /// there isn't enough head-room.
    pub fn prepend(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.head {
            return false;
        }
        self.head -= bytes.len();
        self.region.slice_mut(self.base, self.cap)[self.head..self.head + bytes.len()]
            .copy_from_slice(bytes);
        true
    }

    /// Append `bytes` after the current data, returning `false` if there
    /// isn't enough tail-room.
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if self.tail + bytes.len() > self.cap {
            return false;
        }
        self.region.slice_mut(self.base, self.cap)[self.tail..self.tail + bytes.len()]
            .copy_from_slice(bytes);
        self.tail += bytes.len();
        true
    }

    /// Drop `n` bytes from the front of the valid range (e.g. stripping a
    /// parsed Ethernet/IPv4 header before dispatch).
    pub fn strip_front(&mut self, n: usize) {
        self.head = (self.head + n).min(self.tail);
    }

    pub fn clear(&mut self) {
        self.head = HEAD_ROOM.min(self.cap);
        self.tail = self.head;
        self.port = 0;
    }

    fn offset(&self) -> usize {
        self.base
    }
}

/// Bounded pool of fixed-size buffers for one core.
pub struct BufferPool {
    region: Arc<Region>,
    buffer_capacity: usize,
    free_offsets: Mutex<VecDeque<usize>>,
    tier: PageTier,
}

impl BufferPool {
    /// Build a pool sized per §4.2: `next_pow2((rx+tx+pipeline)*2*queues)`,
    /// minimum 512 buffers, each with at least [`MIN_BUFFER_ROOM`] bytes
    /// of data room (plus head-room).
    pub fn new(
        worker: usize,
        rx_desc: usize,
        tx_desc: usize,
        pipeline_depth: usize,
        queues_per_worker: usize,
    ) -> Result<BufferPool, ResourceError> {
        let raw = (rx_desc + tx_desc + pipeline_depth) * 2 * queues_per_worker.max(1);
        let count = next_pow2(raw.max(1)).max(512);
        let buffer_capacity = HEAD_ROOM + MIN_BUFFER_ROOM;
        let total = count * buffer_capacity;

        let region = Region::reserve_tiered(total)
            .map_err(|_| ResourceError::BufferPoolExhausted { worker })?;
        let tier = region.tier;
        let free_offsets = (0..count).map(|i| i * buffer_capacity).collect();

        Ok(BufferPool {
            region: Arc::new(region),
            buffer_capacity,
            free_offsets: Mutex::new(free_offsets),
            tier,
        })
    }

    pub fn tier(&self) -> PageTier {
        self.tier
    }

    pub fn capacity(&self) -> usize {
        self.free_offsets.lock().unwrap().len()
    }

    /// Acquire a buffer, or `None` if the pool is exhausted. Unlike a
    /// generic allocator this never grows past its initial sizing: a
    /// worker that runs out of buffers backs off rather than allocating
    /// unbounded memory under load.
    pub fn acquire(&self) -> Option<Buffer> {
        let offset = self.free_offsets.lock().unwrap().pop_front()?;
        Some(Buffer::new(self.region.clone(), offset, self.buffer_capacity))
    }

    /// Return a buffer to the pool.
    pub fn release(&self, mut buf: Buffer) {
        buf.clear();
        self.free_offsets.lock().unwrap().push_back(buf.offset());
    }
}

fn next_pow2(mut n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    n -= 1;
    let mut shift = 1;
    while shift < usize::BITS as usize {
        n |= n >> shift;
        shift <<= 1;
    }
    n + 1
}
