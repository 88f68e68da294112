//! Error types for stream-fifo.
//!
//! Every failure is signalled through a [`FifoError`] return value; the
//! queue itself never prints. Blocking-policy outcomes (`QueueFull`,
//! `WouldBlock`) are ordinary flow control for callers driving a pipeline,
//! not fatal conditions.

/// Errors returned by FIFO operations.
///
/// The flagged pull operations use [`FifoError::WouldBlock`] to report
/// "nothing available right now" under a non-blocking policy, and push
/// uses [`FifoError::QueueFull`] when a bounded queue is over capacity
/// and blocking is not requested. Neither leaves the queue in a modified
/// state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FifoError {
    /// The two queues are not mirrored, so there is nothing to unlink.
    #[error("queues are not mirrored")]
    NotMirrored,

    /// A bounded queue is over capacity and `block_max_output` is not set.
    #[error("queue is full")]
    QueueFull,

    /// The queue is empty under a non-blocking policy, or the waiter was
    /// woken by a poke it asked to observe.
    ///
    /// Retry later, or treat as end-of-stream if the upstream has been
    /// unmirrored and `block_no_input` is no longer set.
    #[error("queue is empty, try again")]
    WouldBlock,

    /// Growing the queue's backing storage failed.
    ///
    /// Fatal for the push that hit it: fan-out distribution halts and the
    /// error is surfaced immediately.
    #[error("allocation failed while growing the queue")]
    OutOfMemory,

    /// An unrecognized token was found while parsing block flags.
    #[error("unknown block flag: {token:?}")]
    UnknownBlockFlag {
        /// The token that did not match any flag name.
        token: String,
    },
}

impl FifoError {
    /// Creates an [`FifoError::UnknownBlockFlag`] for the given token.
    pub(crate) fn unknown_flag(token: impl Into<String>) -> Self {
        Self::UnknownBlockFlag {
            token: token.into(),
        }
    }
}
