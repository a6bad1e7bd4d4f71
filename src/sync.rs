use parking_lot::Mutex;

use crate::{
    config::HeapConfig,
    error::HeapResult,
    heap::{Handle, HeapManager, HeapStats},
};

/// A [`HeapManager`] behind a lock, so it can be shared between threads.
///
/// Every call takes the lock for its whole duration. Use [`SharedHeap::with`]
/// when several operations must happen without other threads interleaving.
#[derive(Debug)]
pub struct SharedHeap {
    inner: Mutex<HeapManager>,
}

impl SharedHeap {
    pub fn new(config: HeapConfig) -> HeapResult<Self> {
        Ok(Self::from(HeapManager::new(config)?))
    }

    pub fn allocate(&self, size: usize) -> HeapResult<Option<Handle>> {
        self.inner.lock().allocate(size)
    }

    pub fn release(&self, handle: impl Into<Option<Handle>>) -> HeapResult<()> {
        self.inner.lock().release(handle)
    }

    pub fn collect(&self) {
        self.inner.lock().collect()
    }

    pub fn dump_allocated(&self) -> Vec<(usize, usize)> {
        self.inner.lock().dump_allocated()
    }

    pub fn dump_free(&self) -> Vec<(usize, usize)> {
        self.inner.lock().dump_free()
    }

    pub fn stats(&self) -> HeapStats {
        self.inner.lock().stats()
    }

    /// Runs `f` with exclusive access to the heap.
    pub fn with<R>(&self, f: impl FnOnce(&mut HeapManager) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn into_inner(self) -> HeapManager {
        self.inner.into_inner()
    }
}

impl From<HeapManager> for SharedHeap {
    fn from(heap: HeapManager) -> Self {
        Self { inner: Mutex::new(heap) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics;
    use std::{sync::Arc, thread};

    #[test]
    fn threads_share_one_arena() {
        let heap = Arc::new(SharedHeap::new(HeapConfig::with_arena_capacity(64 * 1024)).unwrap());

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let heap = Arc::clone(&heap);
                thread::spawn(move || {
                    for round in 0..100 {
                        let size = 1 + (worker * 7 + round) % 64;
                        let handle = heap.allocate(size).unwrap().unwrap();

                        heap.with(|heap| heap.bytes_mut(handle).unwrap().fill(worker as u8));
                        heap.with(|heap| {
                            assert!(heap.bytes(handle).unwrap().iter().all(|&b| b == worker as u8))
                        });

                        heap.release(handle).unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        let heap = Arc::into_inner(heap).unwrap().into_inner();
        assert!(heap.dump_allocated().is_empty());
        assert_eq!(diagnostics::verify(&heap), Ok(()));
        assert_eq!(heap.stats().free_bytes, 64 * 1024);
    }

    #[test]
    fn with_groups_operations() {
        let heap = SharedHeap::new(HeapConfig::with_arena_capacity(100)).unwrap();

        let (a, b) = heap.with(|heap| (heap.allocate(10).unwrap(), heap.allocate(10).unwrap()));

        assert_eq!(a.map(Handle::offset), Some(0));
        assert_eq!(b.map(Handle::offset), Some(10));
        assert_eq!(heap.dump_allocated(), vec![(0, 10), (10, 10)]);

        heap.release(a).unwrap();
        heap.release(b).unwrap();
        heap.collect();
        assert_eq!(heap.dump_free(), vec![(0, 10), (10, 10), (20, 80)]);
        assert_eq!(heap.stats().allocated_chunks, 0);
    }
}
