//! Instrumentation decorator for allocators

use std::ptr::NonNull;

use super::Allocator;

/// Allocation traffic observed by a [`ProxyAllocator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationEvent {
    /// An allocation request and its outcome
    Allocate {
        /// Requested size in bytes
        size: usize,
        /// Requested alignment
        alignment: usize,
        /// Returned pointer, `None` on failure
        ptr: Option<NonNull<u8>>,
    },
    /// A deallocation request
    Deallocate {
        /// Pointer passed to the inner allocator
        ptr: Option<NonNull<u8>>,
    },
}

/// Counters kept by a [`ProxyAllocator`] independently of the inner allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    /// Successful allocations
    pub allocations: usize,
    /// Deallocation calls
    pub deallocations: usize,
    /// Allocation requests the inner allocator refused
    pub failed_allocations: usize,
    /// Total bytes requested by successful allocations
    pub bytes_requested: usize,
}

type ProfilingHook = Box<dyn FnMut(&AllocationEvent)>;

/// Forwards to an inner allocator while recording its own statistics
///
/// Wraps any [`Allocator`]; pass `&mut inner` to observe an allocator owned
/// elsewhere. The allocation policy is entirely the inner allocator's.
pub struct ProxyAllocator<A: Allocator> {
    inner: A,
    name: String,
    stats: ProxyStats,
    hook: Option<ProfilingHook>,
}

impl<A: Allocator> ProxyAllocator<A> {
    /// Wrap `inner`, labelling log output with `name`
    pub fn new(name: impl Into<String>, inner: A) -> Self {
        Self {
            inner,
            name: name.into(),
            stats: ProxyStats::default(),
            hook: None,
        }
    }

    /// Install a profiling hook called for every allocation event
    pub fn with_hook(mut self, hook: impl FnMut(&AllocationEvent) + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Remove the profiling hook
    pub fn clear_hook(&mut self) {
        self.hook = None;
    }

    /// Statistics recorded by this proxy
    pub fn stats(&self) -> ProxyStats {
        self.stats
    }

    /// Reset the proxy statistics (the inner allocator is untouched)
    pub fn reset_stats(&mut self) {
        self.stats = ProxyStats::default();
    }

    /// Label used in log output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wrapped allocator
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Wrapped allocator, mutably (e.g. to reset a linear allocator)
    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.inner
    }

    /// Unwrap the proxy
    pub fn into_inner(self) -> A {
        self.inner
    }

    fn notify(&mut self, event: &AllocationEvent) {
        if let Some(hook) = self.hook.as_mut() {
            hook(event);
        }
    }
}

impl<A: Allocator> Allocator for ProxyAllocator<A> {
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        let ptr = self.inner.allocate(size, alignment);
        match ptr {
            Some(p) => {
                self.stats.allocations += 1;
                self.stats.bytes_requested += size;
                log::trace!("[{}] allocate {} bytes (align {}) -> {:p}", self.name, size, alignment, p);
            }
            None => {
                self.stats.failed_allocations += 1;
                log::trace!("[{}] allocate {} bytes (align {}) failed", self.name, size, alignment);
            }
        }
        self.notify(&AllocationEvent::Allocate { size, alignment, ptr });
        ptr
    }

    fn deallocate(&mut self, ptr: Option<NonNull<u8>>) {
        self.inner.deallocate(ptr);
        self.stats.deallocations += 1;
        log::trace!("[{}] deallocate {:?}", self.name, ptr);
        self.notify(&AllocationEvent::Deallocate { ptr });
    }

    fn root(&self) -> *const u8 {
        self.inner.root()
    }

    fn current(&self) -> *const u8 {
        self.inner.current()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn used_memory(&self) -> usize {
        self.inner.used_memory()
    }

    fn allocations(&self) -> usize {
        self.inner.allocations()
    }
}

impl<A: Allocator + std::fmt::Debug> std::fmt::Debug for ProxyAllocator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyAllocator")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .field("stats", &self.stats)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
