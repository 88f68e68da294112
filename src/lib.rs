//! # stream-fifo
//!
//! Mirrored, thread-safe FIFO queues for media streaming pipelines.
//!
//! `stream-fifo` provides the fan-out queue primitive that connects
//! pipeline nodes (demuxer → decoder → filter → encoder → muxer): each
//! node owns one or more queues, pushes into its output queue replicate
//! automatically to every mirrored downstream queue, and consumers pull
//! blocking or non-blocking under configurable backpressure policies.
//! Nodes can be detached and replaced while data is flowing.
//!
//! ## Quick Start
//!
//! ```rust
//! use stream_fifo::{BlockFlags, Capacity, Fifo, Frame, FrameFifo};
//!
//! // A decoder output queue mirrored into two downstream nodes.
//! let decoder: FrameFifo = Fifo::new("decoder", Capacity::Unbounded, BlockFlags::default());
//! let filter = Fifo::new("filter", Capacity::Bounded(16), BlockFlags::default());
//! let preview = Fifo::new("preview", Capacity::Bounded(4), BlockFlags::default());
//! decoder.mirror(&filter);
//! decoder.mirror(&preview);
//!
//! // One push lands in all three queues before it returns.
//! let frame = Frame::new(vec![], 1280, 720, Some(0));
//! decoder.push(Some(&frame))?;
//! assert_eq!(filter.len(), 1);
//! assert_eq!(preview.len(), 1);
//!
//! // Detach a node mid-stream before dropping it.
//! filter.unmirror_all();
//! # Ok::<(), stream_fifo::FifoError>(())
//! ```
//!
//! ## Architecture
//!
//! Every queue is a bounded [`VecDeque`](std::collections::VecDeque)
//! guarded by a mutex and two condition variables (`cond_in` for
//! consumers, `cond_out` for blocked producers), plus two internally
//! locked peer lists recording the mirror graph. Pushes hold the source
//! queue's lock across fan-out, so an item becomes visible across the
//! whole mirror tree atomically; the price is that the mirror graph must
//! stay acyclic.
//!
//! Items are clone-cheap carriers: the shipped [`Frame`] and [`Packet`]
//! types keep their payload behind a reference count, and the queue is
//! generic over any `T: Clone` with the same property.

#![warn(missing_docs)]

mod error;
mod fifo;
mod flags;
mod frame;
mod packet;
mod peers;

pub use error::FifoError;
pub use fifo::Fifo;
pub use flags::{BlockFlags, Capacity, PullFlags};
pub use frame::{Frame, FrameFifo};
pub use packet::{Packet, PacketFifo};
