use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
};

use core::lock;
use core::storage::chain::{
    PacketBuf,
    Segment,
};
use {
    Error,
    Result,
};

/// Allocation counters of a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    pub allocs: usize,
    pub frees: usize,
    pub free_segments: usize,
    pub total_segments: usize,
}

impl PoolStats {
    /// Returns the number of frames allocated and not yet freed.
    pub fn outstanding(&self) -> usize {
        self.allocs.saturating_sub(self.frees)
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    segment_len: usize,
    total_segments: usize,
    free: Mutex<Vec<Box<[u8]>>>,
    allocs: AtomicUsize,
    frees: AtomicUsize,
}

impl Inner {
    pub(crate) fn release(&self, buffers: Vec<Box<[u8]>>) {
        lock(&self.free).extend(buffers);
        self.frees.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fixed pool of equally sized segments that frames are allocated from.
/// Clones share the same segments.
#[derive(Clone, Debug)]
pub struct Pool {
    inner: Arc<Inner>,
}

impl Pool {
    /// Creates a pool of segments buffers, each segment_len bytes long.
    pub fn new(segment_len: usize, segments: usize) -> Pool {
        assert!(segment_len > 0);

        let free = (0 .. segments)
            .map(|_| vec![0; segment_len].into_boxed_slice())
            .collect();

        Pool {
            inner: Arc::new(Inner {
                segment_len,
                total_segments: segments,
                free: Mutex::new(free),
                allocs: AtomicUsize::new(0),
                frees: AtomicUsize::new(0),
            }),
        }
    }

    pub fn segment_len(&self) -> usize {
        self.inner.segment_len
    }

    /// Allocates a chain of segments holding exactly frame_len bytes. No
    /// single segment is guaranteed to hold the whole frame.
    ///
    /// # Errors
    ///
    /// An error occurs if frame_len is zero or there are not enough free
    /// segments, in which case nothing is taken from the pool.
    pub fn alloc(&self, frame_len: usize) -> Result<PacketBuf> {
        if frame_len == 0 {
            return Err(Error::Malformed);
        }

        let segment_len = self.inner.segment_len;
        let needed = (frame_len + segment_len - 1) / segment_len;

        let buffers: Vec<Box<[u8]>> = {
            let mut free = lock(&self.inner.free);
            if free.len() < needed {
                return Err(Error::Exhausted);
            }
            let at = free.len() - needed;
            free.drain(at ..).collect()
        };

        let mut remaining = frame_len;
        let segments = buffers
            .into_iter()
            .map(|buffer| {
                let len = if remaining > segment_len {
                    segment_len
                } else {
                    remaining
                };
                remaining -= len;
                Segment::new(buffer, len)
            })
            .collect();

        self.inner.allocs.fetch_add(1, Ordering::SeqCst);

        Ok(PacketBuf::pooled(segments, self.inner.clone()))
    }

    pub fn stats(&self) -> PoolStats {
        // Frees never overtake allocs, so read them first.
        let frees = self.inner.frees.load(Ordering::SeqCst);
        PoolStats {
            allocs: self.inner.allocs.load(Ordering::SeqCst),
            frees,
            free_segments: lock(&self.inner.free).len(),
            total_segments: self.inner.total_segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_alloc_splits_into_segments() {
        let pool = Pool::new(512, 8);
        let frame = pool.alloc(1514).unwrap();

        let lens: Vec<usize> = frame.segments().map(|segment| segment.len()).collect();
        assert_eq!(lens, vec![512, 512, 490]);
        assert_eq!(frame.len(), 1514);
        assert_eq!(pool.stats().free_segments, 5);
    }

    #[test]
    fn test_drop_returns_segments() {
        let pool = Pool::new(64, 4);
        {
            let _frame = pool.alloc(100).unwrap();
            assert_eq!(pool.stats().outstanding(), 1);
        }

        let stats = pool.stats();
        assert_eq!(stats.allocs, 1);
        assert_eq!(stats.frees, 1);
        assert_eq!(stats.free_segments, 4);
    }

    #[test]
    fn test_outstanding_never_underflows() {
        let stats = PoolStats {
            allocs: 1,
            frees: 2,
            free_segments: 0,
            total_segments: 0,
        };
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_stats_during_concurrent_churn() {
        let pool = Pool::new(64, 8);
        let workers: Vec<_> = (0 .. 4)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || {
                    for _ in 0 .. 1000 {
                        if let Ok(frame) = pool.alloc(64) {
                            drop(frame);
                        }
                    }
                })
            })
            .collect();

        for _ in 0 .. 1000 {
            let stats = pool.stats();
            assert!(stats.frees <= stats.allocs);
            assert!(stats.outstanding() <= 4);
        }
        for worker in workers {
            worker.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.allocs, stats.frees);
        assert_eq!(stats.free_segments, 8);
    }

    #[test]
    fn test_alloc_exhausted_has_no_side_effects() {
        let pool = Pool::new(64, 2);
        assert_matches!(pool.alloc(129), Err(Error::Exhausted));

        let stats = pool.stats();
        assert_eq!(stats.allocs, 0);
        assert_eq!(stats.free_segments, 2);
    }

    #[test]
    fn test_alloc_zero_len() {
        let pool = Pool::new(64, 2);
        assert_matches!(pool.alloc(0), Err(Error::Malformed));
    }

    #[test]
    fn test_copy_round_trip_through_pool() {
        let pool = Pool::new(4, 4);
        let src: Vec<u8> = (0 .. 10).collect();

        let mut frame = pool.alloc(src.len()).unwrap();
        frame.copy_from_slice(&src).unwrap();
        assert_eq!(frame.segment_count(), 3);
        assert_eq!(frame.to_vec(), src);
    }
}
