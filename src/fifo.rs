//! The mirrored FIFO core.
//!
//! A [`Fifo`] is a bounded queue of clone-cheap items guarded by a mutex
//! and two condition variables, plus two peer lists implementing fan-out
//! mirroring: every push lands locally and is replicated into each
//! mirrored destination before the push returns.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::peers::PeerList;
use crate::{BlockFlags, Capacity, FifoError, PullFlags};

/// Queue state guarded by the FIFO's lock.
struct State<T> {
    queued: VecDeque<T>,
    capacity: Capacity,
    block_flags: BlockFlags,
    poked: bool,
}

struct Inner<T> {
    /// Name of the owning node, used only in diagnostics.
    label: String,
    state: Mutex<State<T>>,
    /// Signalled on new item or poke.
    cond_in: Condvar,
    /// Signalled when a pop frees a slot in a bounded queue.
    cond_out: Condvar,
    /// Peers this queue replicates pushes into.
    dests: PeerList<T>,
    /// Peers that replicate their pushes into this queue.
    sources: PeerList<T>,
}

/// A shared handle to a mirrored FIFO queue.
///
/// Handles are reference counted: `clone` is cheap and every clone
/// addresses the same queue. The queue is destroyed when the last handle
/// drops.
///
/// # Mirroring
///
/// [`mirror`](Fifo::mirror) links two queues so that every push into the
/// source also lands in the destination, recursively through the whole
/// mirror tree, before the push returns. Mirror links are symmetric
/// (each end records the other), which means two linked queues keep each
/// other alive: call [`unmirror_all`](Fifo::unmirror_all) before dropping
/// a queue's last handle, both to break the link and to wake consumers
/// blocked on its destinations. The mirror graph must stay acyclic; a
/// cycle deadlocks at push time.
///
/// # Blocking
///
/// Pulls block on an empty queue only when the queue's
/// [`BlockFlags::block_no_input`] policy is set, and pushes block on a
/// full bounded queue only under [`BlockFlags::block_max_output`]. Both
/// policies can be changed at runtime; blocked consumers re-read them on
/// every wake.
///
/// # Example
///
/// ```
/// use stream_fifo::{BlockFlags, Capacity, Fifo};
///
/// let src: Fifo<u32> = Fifo::new("decoder", Capacity::Unbounded, BlockFlags::default());
/// let dst = Fifo::new("encoder", Capacity::Unbounded, BlockFlags::default());
/// src.mirror(&dst);
///
/// src.push(Some(&7)).unwrap();
/// assert_eq!(src.pop(), Some(7));
/// assert_eq!(dst.pop(), Some(7));
/// ```
pub struct Fifo<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Fifo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Fifo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fifo")
            .field("label", &self.inner.label)
            .finish_non_exhaustive()
    }
}

impl<T> Fifo<T> {
    /// Returns `true` if both handles address the same queue.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// The owning node's name, as passed to [`Fifo::new`].
    pub fn label(&self) -> &str {
        &self.inner.label
    }
}

impl<T: Clone> Fifo<T> {
    /// Creates a queue owned by the node named `label`.
    ///
    /// The label appears in diagnostics only. Capacity and block flags
    /// can both be changed later at runtime.
    pub fn new(label: impl Into<String>, capacity: Capacity, block_flags: BlockFlags) -> Self {
        let label = label.into();
        tracing::trace!(fifo = %label, ?capacity, "creating fifo");
        Self {
            inner: Arc::new(Inner {
                label,
                state: Mutex::new(State {
                    queued: VecDeque::new(),
                    capacity,
                    block_flags,
                    poked: false,
                }),
                cond_in: Condvar::new(),
                cond_out: Condvar::new(),
                dests: PeerList::new(),
                sources: PeerList::new(),
            }),
        }
    }

    /// Links `dst` as a mirror of this queue.
    ///
    /// Every subsequent push into `self` is replicated into `dst`. The
    /// link is symmetric bookkeeping: `dst` records `self` as a source
    /// and `self` records `dst` as a destination, so unlinking from
    /// either end cleans both directions.
    pub fn mirror(&self, dst: &Fifo<T>) {
        tracing::debug!(
            src = %self.inner.label,
            dst = %dst.inner.label,
            "mirroring fifo output"
        );
        dst.inner.sources.append(self);
        self.inner.dests.append(dst);
    }

    /// Removes the mirror link between this queue and `dst`.
    ///
    /// # Errors
    ///
    /// [`FifoError::NotMirrored`] if the queues were not linked.
    pub fn unmirror(&self, dst: &Fifo<T>) -> Result<(), FifoError> {
        tracing::debug!(
            src = %self.inner.label,
            dst = %dst.inner.label,
            "unmirroring fifo output"
        );
        let dest_entry = self.inner.dests.pop_where(|e| Fifo::ptr_eq(e, dst));
        let source_entry = dst.inner.sources.pop_where(|e| Fifo::ptr_eq(e, self));
        if dest_entry.is_none() || source_entry.is_none() {
            return Err(FifoError::NotMirrored);
        }
        Ok(())
    }

    /// Detaches this queue from every source and destination.
    ///
    /// Each former destination's `cond_in` is signalled so a consumer
    /// blocked pulling from it wakes up and re-checks its policy; with
    /// `block_no_input` cleared, the wake reads as end-of-stream. This is
    /// the coordinated-shutdown step before dropping a node mid-stream.
    pub fn unmirror_all(&self) {
        tracing::debug!(fifo = %self.inner.label, "unmirroring all peers");
        let _guard = self.inner.state.lock();

        while let Some(source) = self.inner.sources.pop_first() {
            source.inner.dests.pop_where(|e| Fifo::ptr_eq(e, self));
            tracing::trace!(
                fifo = %self.inner.label,
                source = %source.inner.label,
                "detached from source"
            );
        }

        while let Some(dest) = self.inner.dests.pop_first() {
            dest.inner.sources.pop_where(|e| Fifo::ptr_eq(e, self));

            // unblock anyone pulling from this dest
            dest.inner.cond_in.notify_one();

            tracing::trace!(
                fifo = %self.inner.label,
                dest = %dest.inner.label,
                "detached from dest"
            );
        }
    }

    /// Pushes an item into this queue and every mirrored destination.
    ///
    /// The item is cloned into the local queue (unless the capacity is
    /// [`Capacity::Passthrough`]) and then distributed, recursively and
    /// still under this queue's lock, to each destination in the order
    /// they were mirrored: the item is visible across the whole mirror
    /// tree before this call returns.
    ///
    /// `None` is the end-of-stream sentinel: it fans out to every
    /// destination but never enqueues locally and is never blocked or
    /// rejected by the capacity policy.
    ///
    /// # Errors
    ///
    /// - [`FifoError::QueueFull`] — the queue is bounded, over capacity,
    ///   and `block_max_output` is not set. Nothing is distributed.
    /// - [`FifoError::OutOfMemory`] — growing the queue failed, here or in
    ///   any destination; distribution halts immediately.
    ///
    /// Any other error from a destination is recorded, distribution
    /// continues, and the first such error is returned at the end so one
    /// misconfigured downstream does not starve its siblings.
    pub fn push(&self, item: Option<&T>) -> Result<(), FifoError> {
        let mut state = self.inner.state.lock();

        if !matches!(state.capacity, Capacity::Passthrough) {
            if let Some(item) = item {
                if let Capacity::Bounded(max) = state.capacity {
                    if state.queued.len() > max {
                        if !state.block_flags.block_max_output {
                            return Err(FifoError::QueueFull);
                        }
                        // A single wait, not a loop: one wake is taken as
                        // permission to push even if still over capacity.
                        self.inner.cond_out.wait(&mut state);
                    }
                }

                state
                    .queued
                    .try_reserve(1)
                    .map_err(|_| FifoError::OutOfMemory)?;
                state.queued.push_back(item.clone());

                self.inner.cond_in.notify_one();
            }
        }

        // Distribute while holding our own lock. Destination locks are
        // taken in push order, which is deadlock-free as long as the
        // mirror graph has no cycles.
        let mut first_err = None;
        while let Some(dest) = self.inner.dests.iter_next() {
            match dest.push(item) {
                Ok(()) => {}
                Err(FifoError::OutOfMemory) => {
                    self.inner.dests.halt();
                    return Err(FifoError::OutOfMemory);
                }
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Wakes a consumer blocked pulling from this queue without
    /// delivering an item.
    ///
    /// Only pullers that pass [`PullFlags::poke`] observe the wake as a
    /// [`WouldBlock`](FifoError::WouldBlock) return; everyone else clears
    /// the flag and re-enters the wait.
    pub fn poke(&self) {
        tracing::debug!(fifo = %self.inner.label, "poking fifo");
        self.inner.state.lock().poked = true;
        self.inner.cond_in.notify_one();
    }

    /// Removes and returns the oldest item, blocking while the queue is
    /// empty if `block_no_input` is set.
    ///
    /// Returns `None` when the queue is empty under a non-blocking
    /// policy, or after a wake with the blocking policy cleared (the
    /// end-of-stream condition).
    pub fn pop(&self) -> Option<T> {
        self.pull(PullFlags::default(), true).ok()
    }

    /// Returns a clone of the oldest item without removing it; blocking
    /// behavior matches [`pop`](Fifo::pop).
    pub fn peek(&self) -> Option<T> {
        self.pull(PullFlags::default(), false).ok()
    }

    /// [`pop`](Fifo::pop) with per-call flags.
    ///
    /// # Errors
    ///
    /// [`FifoError::WouldBlock`] when the queue is empty under a
    /// non-blocking policy, or when a poke was observed via
    /// [`PullFlags::poke`].
    pub fn pop_flags(&self, flags: PullFlags) -> Result<T, FifoError> {
        self.pull(flags, true)
    }

    /// [`peek`](Fifo::peek) with per-call flags.
    ///
    /// # Errors
    ///
    /// Same as [`pop_flags`](Fifo::pop_flags).
    pub fn peek_flags(&self, flags: PullFlags) -> Result<T, FifoError> {
        self.pull(flags, false)
    }

    /// The single wait-loop behind all four pull variants.
    fn pull(&self, flags: PullFlags, take: bool) -> Result<T, FifoError> {
        let mut state = self.inner.state.lock();
        loop {
            if take {
                if let Some(item) = state.queued.pop_front() {
                    if matches!(state.capacity, Capacity::Bounded(_)) {
                        self.inner.cond_out.notify_one();
                    }
                    return Ok(item);
                }
            } else if let Some(item) = state.queued.front() {
                return Ok(item.clone());
            }

            // The blocking policy may change while we wait, so re-read it
            // on every pass.
            if !state.block_flags.block_no_input || flags.no_block {
                return Err(FifoError::WouldBlock);
            }

            if !state.poked {
                self.inner.cond_in.wait(&mut state);
            }

            if flags.poke && state.poked {
                state.poked = false;
                return Err(FifoError::WouldBlock);
            }
            state.poked = false;
        }
    }

    /// Whether the queue is at or beyond its reporting threshold.
    ///
    /// `Passthrough` queues always report full and unbounded queues never
    /// do. For `Bounded(n)` the predicate is strictly `len > n + 1`, one
    /// item beyond the point where pushes start failing; the historical
    /// off-by-one is kept for behavioral compatibility.
    pub fn is_full(&self) -> bool {
        let state = self.inner.state.lock();
        match state.capacity {
            Capacity::Unbounded => false,
            Capacity::Passthrough => true,
            Capacity::Bounded(max) => state.queued.len() > max + 1,
        }
    }

    /// Number of items currently queued locally.
    pub fn len(&self) -> usize {
        self.inner.state.lock().queued.len()
    }

    /// Returns `true` if no items are queued locally.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current capacity policy.
    pub fn capacity(&self) -> Capacity {
        self.inner.state.lock().capacity
    }

    /// Maximum number of locally queued items, with `usize::MAX` reported
    /// for an unbounded queue.
    pub fn max_len(&self) -> usize {
        self.capacity().report_max()
    }

    /// Replaces the capacity policy.
    ///
    /// Items already queued are never dropped; if the new capacity is
    /// smaller than the current length, subsequent pushes block or fail
    /// per policy until pops catch up.
    pub fn set_capacity(&self, capacity: Capacity) {
        self.inner.state.lock().capacity = capacity;
    }

    /// The current blocking policy.
    pub fn block_flags(&self) -> BlockFlags {
        self.inner.state.lock().block_flags
    }

    /// Replaces the blocking policy.
    ///
    /// Takes effect atomically; consumers blocked in a pull re-read the
    /// flags on their next wake.
    pub fn set_block_flags(&self, flags: BlockFlags) {
        self.inner.state.lock().block_flags = flags;
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        tracing::trace!(
            fifo = %self.label,
            queued = self.state.get_mut().queued.len(),
            "destroying fifo"
        );
    }
}
