//! The collector interface the runtime is written against.
//!
//! The core needs three things from a collector: zeroed, tracked heap
//! allocation for objects; uncollectable root slots that the collector can
//! see but must never reclaim (global variable storage); and an explicit
//! collection hook. The default collector bound here allocates and never
//! reclaims, which satisfies the contract — objects, closures and strings
//! keep their slot arrays inline after the header, so a real collector can
//! scan them transitively from roots without cooperation from this module.
//!
//! Every allocation is aligned to at least 8 bytes. Tagged values depend on
//! this: an object pointer must have its low three bits clear.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Minimum alignment of every heap allocation.
pub const MIN_ALIGN: usize = 8;

static TOTAL_ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static HEAP_BYTES: AtomicUsize = AtomicUsize::new(0);
static ROOT_BYTES: AtomicUsize = AtomicUsize::new(0);
static COLLECTIONS: AtomicUsize = AtomicUsize::new(0);

/// Point-in-time heap statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapStats {
    /// Bytes allocated over the life of the process.
    pub total_allocated: usize,
    /// Bytes currently occupied by tracked objects.
    pub heap_bytes: usize,
    /// Bytes currently occupied by uncollectable root slots.
    pub root_bytes: usize,
    /// Number of explicit collection requests.
    pub collections: usize,
}

fn layout_for(size: usize) -> Layout {
    let size = size.max(MIN_ALIGN);
    match Layout::from_size_align(size, MIN_ALIGN) {
        Ok(layout) => layout,
        Err(_) => alloc_overflow(size),
    }
}

#[cold]
fn alloc_overflow(size: usize) -> ! {
    panic!("allocation of {size} bytes overflows the heap layout");
}

/// Allocate `size` zeroed, tracked bytes.
///
/// The returned storage is aligned to [`MIN_ALIGN`] and lives until the
/// collector decides otherwise (with the default collector: forever).
pub fn alloc(size: usize) -> NonNull<u8> {
    let layout = layout_for(size);
    let ptr = unsafe { alloc_zeroed(layout) };
    let Some(ptr) = NonNull::new(ptr) else {
        handle_alloc_error(layout);
    };
    TOTAL_ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed);
    HEAP_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
    ptr
}

/// Allocate `size` zeroed bytes that the collector treats as a root and
/// never reclaims on its own. Release with [`free_uncollectable`].
///
/// The allocation is prefixed with a hidden size word so it can be freed
/// without the caller remembering the size.
pub fn alloc_uncollectable(size: usize) -> NonNull<u8> {
    let layout = layout_for(size + MIN_ALIGN);
    let ptr = unsafe { alloc_zeroed(layout) };
    let Some(ptr) = NonNull::new(ptr) else {
        handle_alloc_error(layout);
    };
    unsafe {
        ptr.as_ptr().cast::<usize>().write(layout.size());
    }
    TOTAL_ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed);
    ROOT_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
    unsafe { NonNull::new_unchecked(ptr.as_ptr().add(MIN_ALIGN)) }
}

/// Free a root slot obtained from [`alloc_uncollectable`].
///
/// # Safety
///
/// `ptr` must come from `alloc_uncollectable` and must not be used again.
pub unsafe fn free_uncollectable(ptr: NonNull<u8>) {
    let base = unsafe { ptr.as_ptr().sub(MIN_ALIGN) };
    let size = unsafe { base.cast::<usize>().read() };
    ROOT_BYTES.fetch_sub(size, Ordering::Relaxed);
    let layout = match Layout::from_size_align(size, MIN_ALIGN) {
        Ok(layout) => layout,
        Err(_) => alloc_overflow(size),
    };
    unsafe { dealloc(base, layout) };
}

/// Request a collection.
///
/// A hook for the embedded collector; the default collector records the
/// request and reclaims nothing.
pub fn collect() {
    COLLECTIONS.fetch_add(1, Ordering::Relaxed);
}

/// Current heap statistics.
#[must_use]
pub fn stats() -> HeapStats {
    HeapStats {
        total_allocated: TOTAL_ALLOCATED.load(Ordering::Relaxed),
        heap_bytes: HEAP_BYTES.load(Ordering::Relaxed),
        root_bytes: ROOT_BYTES.load(Ordering::Relaxed),
        collections: COLLECTIONS.load(Ordering::Relaxed),
    }
}
