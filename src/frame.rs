//! Uncompressed media frames.

use std::sync::Arc;

use bytes::Bytes;

use crate::Fifo;

/// A FIFO of uncompressed frames.
pub type FrameFifo = Fifo<Frame>;

/// An uncompressed media frame.
///
/// The payload lives behind a shared reference count: cloning a `Frame`
/// is O(1) and never copies sample data, so a frame can sit in several
/// mirrored queues at once while sharing one allocation. The last clone
/// to drop releases the storage.
///
/// Plane layout is up to the producer: a video frame typically carries
/// one buffer per color plane, an audio frame one buffer per channel.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use stream_fifo::Frame;
///
/// let frame = Frame::new(vec![Bytes::from_static(&[0u8; 16])], 4, 4, Some(0));
/// let copy = frame.clone(); // refcount bump, no sample copy
/// assert_eq!(copy.width(), 4);
/// assert_eq!(copy.plane(0).map(Bytes::len), Some(16));
/// ```
#[derive(Debug, Clone)]
pub struct Frame {
    inner: Arc<FrameInner>,
}

#[derive(Debug)]
struct FrameInner {
    planes: Vec<Bytes>,
    width: u32,
    height: u32,
    pts: Option<i64>,
}

impl Frame {
    /// Creates a frame from its plane buffers and geometry.
    pub fn new(planes: Vec<Bytes>, width: u32, height: u32, pts: Option<i64>) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                planes,
                width,
                height,
                pts,
            }),
        }
    }

    /// Presentation timestamp in stream time base units, if known.
    pub fn pts(&self) -> Option<i64> {
        self.inner.pts
    }

    /// Frame width in pixels (0 for non-video payloads).
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Frame height in pixels (0 for non-video payloads).
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// The buffer for plane `index`, if present.
    pub fn plane(&self, index: usize) -> Option<&Bytes> {
        self.inner.planes.get(index)
    }

    /// Number of planes in this frame.
    pub fn plane_count(&self) -> usize {
        self.inner.planes.len()
    }
}
