use std::ops::{
    Deref,
    DerefMut,
};
use std::slice::Iter as SliceIter;
use std::sync::Arc;

use core::storage::pool::Inner as PoolInner;
use {
    Error,
    Result,
};

/// One segment of a frame: a resizable view over a fixed size buffer.
#[derive(Debug)]
pub struct Segment {
    buffer: Box<[u8]>,
    len: usize,
}

impl Segment {
    pub(crate) fn new(buffer: Box<[u8]>, len: usize) -> Segment {
        debug_assert!(len <= buffer.len());
        Segment { buffer, len }
    }

    /// Returns the size of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn into_buffer(self) -> Box<[u8]> {
        self.buffer
    }
}

impl Deref for Segment {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer[0 .. self.len]
    }
}

impl DerefMut for Segment {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[0 .. self.len]
    }
}

/// A frame stored as a chain of segments. A single contiguous region is a
/// chain of one.
///
/// Frames allocated from a `Pool` return their segments when dropped.
#[derive(Debug)]
pub struct PacketBuf {
    segments: Vec<Segment>,
    pool: Option<Arc<PoolInner>>,
}

impl PacketBuf {
    pub(crate) fn pooled(segments: Vec<Segment>, pool: Arc<PoolInner>) -> PacketBuf {
        PacketBuf {
            segments,
            pool: Some(pool),
        }
    }

    /// Creates a heap backed frame from a contiguous buffer.
    pub fn from_vec(buffer: Vec<u8>) -> PacketBuf {
        let len = buffer.len();
        PacketBuf {
            segments: vec![Segment::new(buffer.into_boxed_slice(), len)],
            pool: None,
        }
    }

    /// Creates a heap backed frame from already split segments.
    pub fn from_segments(buffers: Vec<Vec<u8>>) -> PacketBuf {
        let segments = buffers
            .into_iter()
            .map(|buffer| {
                let len = buffer.len();
                Segment::new(buffer.into_boxed_slice(), len)
            })
            .collect();

        PacketBuf {
            segments,
            pool: None,
        }
    }

    /// Returns the total length of the frame over all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|segment| segment.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the segments in frame order.
    pub fn segments(&self) -> SliceIter<Segment> {
        self.segments.iter()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Fills the frame from a contiguous buffer, crossing segment boundaries
    /// in order.
    ///
    /// # Errors
    ///
    /// An error occurs if src is not exactly as long as the frame.
    pub fn copy_from_slice(&mut self, src: &[u8]) -> Result<()> {
        if src.len() != self.len() {
            return Err(Error::Malformed);
        }

        let mut copied = 0;
        for segment in self.segments.iter_mut() {
            let len = segment.len();
            segment.copy_from_slice(&src[copied .. copied + len]);
            copied += len;
        }

        Ok(())
    }

    /// Serializes every segment in order into a contiguous buffer and returns
    /// the number of bytes written.
    ///
    /// # Errors
    ///
    /// An error occurs if dst is shorter than the frame.
    pub fn copy_to_slice(&self, dst: &mut [u8]) -> Result<usize> {
        let total = self.len();
        if dst.len() < total {
            return Err(Error::Exhausted);
        }

        let mut written = 0;
        for segment in self.segments.iter().filter(|segment| segment.len() > 0) {
            dst[written .. written + segment.len()].copy_from_slice(segment);
            written += segment.len();
        }

        Ok(written)
    }

    /// Returns a contiguous copy of the frame.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buffer = vec![0; self.len()];
        let written = self.copy_to_slice(&mut buffer).unwrap_or(0);
        buffer.truncate(written);
        buffer
    }
}

impl Drop for PacketBuf {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let buffers = self.segments.drain(..).map(Segment::into_buffer).collect();
            pool.release(buffers);
        }
    }
}
