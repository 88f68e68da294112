//! Compressed media packets.

use std::sync::Arc;

use bytes::Bytes;

use crate::Fifo;

/// A FIFO of compressed packets.
pub type PacketFifo = Fifo<Packet>;

/// A compressed media packet.
///
/// Like [`Frame`](crate::Frame), the payload sits behind a shared
/// reference count so clones are O(1); a packet queued in several
/// mirrored FIFOs shares one allocation.
#[derive(Debug, Clone)]
pub struct Packet {
    inner: Arc<PacketInner>,
}

#[derive(Debug)]
struct PacketInner {
    data: Bytes,
    stream_index: usize,
    pts: Option<i64>,
    dts: Option<i64>,
    keyframe: bool,
}

impl Packet {
    /// Creates a packet with no timing information.
    pub fn new(data: impl Into<Bytes>, stream_index: usize) -> Self {
        Self::with_timing(data, stream_index, None, None, false)
    }

    /// Creates a packet with timestamps and keyframe flag.
    pub fn with_timing(
        data: impl Into<Bytes>,
        stream_index: usize,
        pts: Option<i64>,
        dts: Option<i64>,
        keyframe: bool,
    ) -> Self {
        Self {
            inner: Arc::new(PacketInner {
                data: data.into(),
                stream_index,
                pts,
                dts,
                keyframe,
            }),
        }
    }

    /// The compressed payload.
    pub fn data(&self) -> &Bytes {
        &self.inner.data
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.inner.data.len()
    }

    /// Index of the stream this packet belongs to.
    pub fn stream_index(&self) -> usize {
        self.inner.stream_index
    }

    /// Presentation timestamp in stream time base units, if known.
    pub fn pts(&self) -> Option<i64> {
        self.inner.pts
    }

    /// Decode timestamp in stream time base units, if known.
    pub fn dts(&self) -> Option<i64> {
        self.inner.dts
    }

    /// Whether the packet starts a decodable unit.
    pub fn is_key(&self) -> bool {
        self.inner.keyframe
    }
}
