//! Blocking policies and capacity configuration for queues.

use std::fmt;
use std::str::FromStr;

use crate::FifoError;

/// Blocking policy attached to a queue.
///
/// Flags may be changed at runtime with
/// [`Fifo::set_block_flags`](crate::Fifo::set_block_flags); blocked
/// consumers re-read them on every wake, so clearing `block_no_input`
/// while a consumer waits converts the next wake into a
/// [`WouldBlock`](crate::FifoError::WouldBlock) return.
///
/// # Example
///
/// ```
/// use stream_fifo::BlockFlags;
///
/// let flags: BlockFlags = "block_no_input,pull_no_block".parse().unwrap();
/// assert!(flags.block_no_input);
/// assert!(!flags.block_max_output);
/// assert!(flags.pull_no_block);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockFlags {
    /// Pulls on an empty queue block until an item arrives.
    pub block_no_input: bool,

    /// Pushes into a bounded queue over capacity block until a pop frees
    /// a slot, instead of returning [`QueueFull`](crate::FifoError::QueueFull).
    ///
    /// The wait is advisory: a single wake permits the push to proceed
    /// even if the queue is still over capacity.
    pub block_max_output: bool,

    /// Reserved policy bit carried for wire-format compatibility.
    ///
    /// Pull calls decide blocking from their own [`PullFlags`]; this bit
    /// is parsed and stored but not consulted by the pull path.
    pub pull_no_block: bool,
}

impl FromStr for BlockFlags {
    type Err = FifoError;

    /// Parses a comma-separated list of lowercase flag names.
    ///
    /// Recognized tokens are exactly `block_no_input`, `block_max_output`
    /// and `pull_no_block`. Empty segments are skipped; anything else is
    /// an [`UnknownBlockFlag`](FifoError::UnknownBlockFlag) error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = BlockFlags::default();
        for token in s.split(',').filter(|t| !t.is_empty()) {
            match token {
                "block_no_input" => flags.block_no_input = true,
                "block_max_output" => flags.block_max_output = true,
                "pull_no_block" => flags.pull_no_block = true,
                other => return Err(FifoError::unknown_flag(other)),
            }
        }
        Ok(flags)
    }
}

impl fmt::Display for BlockFlags {
    /// Renders the same comma-separated wire format `from_str` accepts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for (set, name) in [
            (self.block_no_input, "block_no_input"),
            (self.block_max_output, "block_max_output"),
            (self.pull_no_block, "pull_no_block"),
        ] {
            if set {
                write!(f, "{sep}{name}")?;
                sep = ",";
            }
        }
        Ok(())
    }
}

/// Per-call options for the flagged pull operations.
///
/// Unlike [`BlockFlags`], these are not stored on the queue; each
/// [`pop_flags`](crate::Fifo::pop_flags) /
/// [`peek_flags`](crate::Fifo::peek_flags) call supplies its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullFlags {
    /// Never block, even when the queue's `block_no_input` policy is set.
    pub no_block: bool,

    /// Observe pokes: a wake caused by [`poke`](crate::Fifo::poke) returns
    /// [`WouldBlock`](crate::FifoError::WouldBlock) instead of re-entering
    /// the wait, letting the caller re-check external state.
    pub poke: bool,
}

/// Capacity policy for a queue.
///
/// A `Bounded(n)` queue admits up to `n + 1` items before pushes block or
/// fail; a `Passthrough` queue never buffers locally and only replicates
/// pushes to its mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// The queue grows without bound.
    Unbounded,

    /// The queue never buffers locally; pushes only fan out to mirrors.
    Passthrough,

    /// The queue holds at most `n + 1` items.
    Bounded(usize),
}

impl Capacity {
    /// Maximum number of locally queued items, with `usize::MAX` standing
    /// in for unbounded.
    pub(crate) fn report_max(self) -> usize {
        match self {
            Capacity::Unbounded => usize::MAX,
            Capacity::Passthrough => 0,
            Capacity::Bounded(n) => n,
        }
    }
}
