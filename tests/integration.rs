//! Integration tests for stream-fifo.
//!
//! These exercise the cross-thread behavior of the queues: blocking
//! pulls and pushes, pokes, and detaching nodes while consumers are
//! parked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use stream_fifo::{
    BlockFlags, Capacity, Fifo, FifoError, Frame, FrameFifo, Packet, PacketFifo, PullFlags,
};

const WAIT: Duration = Duration::from_millis(100);
const TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn blocking_input() -> BlockFlags {
    BlockFlags {
        block_no_input: true,
        ..Default::default()
    }
}

#[test]
fn test_blocking_pop_wakes_on_push() {
    let f: Fifo<u32> = Fifo::new("consumer", Capacity::Unbounded, blocking_input());
    let (tx, rx) = mpsc::channel();

    let puller = {
        let f = f.clone();
        thread::spawn(move || {
            tx.send(f.pop()).unwrap();
        })
    };

    // the consumer is parked; nothing arrives until we push
    assert!(rx.recv_timeout(WAIT).is_err());

    f.push(Some(&11)).unwrap();
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), Some(11));
    puller.join().unwrap();
}

#[test]
fn test_poke_without_flag_keeps_consumer_blocked() {
    let f: Fifo<u32> = Fifo::new("consumer", Capacity::Unbounded, blocking_input());
    let returned = Arc::new(AtomicBool::new(false));

    let puller = {
        let f = f.clone();
        let returned = Arc::clone(&returned);
        thread::spawn(move || {
            let item = f.pop();
            returned.store(true, Ordering::SeqCst);
            item
        })
    };

    thread::sleep(WAIT);
    f.poke();
    thread::sleep(WAIT);

    // the poke was consumed but the queue is still empty and the policy
    // still blocks, so the consumer re-entered the wait
    assert!(!returned.load(Ordering::SeqCst));

    f.push(Some(&5)).unwrap();
    assert_eq!(puller.join().unwrap(), Some(5));
    assert!(returned.load(Ordering::SeqCst));
}

#[test]
fn test_poke_with_flag_returns_would_block() {
    let f: Fifo<u32> = Fifo::new("consumer", Capacity::Unbounded, blocking_input());
    let (tx, rx) = mpsc::channel();

    let puller = {
        let f = f.clone();
        thread::spawn(move || {
            let flags = PullFlags {
                poke: true,
                ..Default::default()
            };
            tx.send(f.pop_flags(flags)).unwrap();
        })
    };

    thread::sleep(WAIT);
    f.poke();

    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), Err(FifoError::WouldBlock));
    puller.join().unwrap();
}

#[test]
fn test_blocking_push_waits_for_pop() {
    let flags = BlockFlags {
        block_max_output: true,
        ..Default::default()
    };
    let f: Fifo<u32> = Fifo::new("producer", Capacity::Bounded(1), flags);
    f.push(Some(&1)).unwrap();
    f.push(Some(&2)).unwrap();

    let pushed = Arc::new(AtomicBool::new(false));
    let pusher = {
        let f = f.clone();
        let pushed = Arc::clone(&pushed);
        thread::spawn(move || {
            f.push(Some(&3)).unwrap();
            pushed.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(WAIT);
    assert!(!pushed.load(Ordering::SeqCst));

    // a pop frees a slot and signals the parked producer
    assert_eq!(f.pop(), Some(1));
    pusher.join().unwrap();
    assert!(pushed.load(Ordering::SeqCst));
    assert_eq!(f.pop(), Some(2));
    assert_eq!(f.pop(), Some(3));
}

#[test]
fn test_producer_consumer_preserves_order() {
    const COUNT: u32 = 200;

    let flags = BlockFlags {
        block_no_input: true,
        block_max_output: true,
        ..Default::default()
    };
    let f: Fifo<u32> = Fifo::new("pipe", Capacity::Bounded(4), flags);

    let producer = {
        let f = f.clone();
        thread::spawn(move || {
            for i in 0..COUNT {
                f.push(Some(&i)).unwrap();
            }
        })
    };

    let consumer = {
        let f = f.clone();
        thread::spawn(move || (0..COUNT).map(|_| f.pop()).collect::<Vec<_>>())
    };

    producer.join().unwrap();
    let received = consumer.join().unwrap();
    let expected: Vec<_> = (0..COUNT).map(Some).collect();
    assert_eq!(received, expected);
}

#[test]
fn test_fan_out_feeds_two_blocked_consumers() {
    const COUNT: u32 = 50;

    let src: Fifo<u32> = Fifo::new("src", Capacity::Passthrough, BlockFlags::default());
    let d1: Fifo<u32> = Fifo::new("d1", Capacity::Unbounded, blocking_input());
    let d2: Fifo<u32> = Fifo::new("d2", Capacity::Unbounded, blocking_input());
    src.mirror(&d1);
    src.mirror(&d2);

    let consumers: Vec<_> = [&d1, &d2]
        .into_iter()
        .map(|d| {
            let d = d.clone();
            thread::spawn(move || (0..COUNT).map(|_| d.pop()).collect::<Vec<_>>())
        })
        .collect();

    for i in 0..COUNT {
        src.push(Some(&i)).unwrap();
    }
    assert_eq!(src.len(), 0);

    let expected: Vec<_> = (0..COUNT).map(Some).collect();
    for consumer in consumers {
        assert_eq!(consumer.join().unwrap(), expected);
    }
}

/// Replacing a node mid-stream: the consumer downstream of the node
/// being destroyed is parked in `pop` and must come back.
#[test]
fn test_hot_swap_wakes_blocked_consumer() {
    init_tracing();

    let src: FrameFifo = Fifo::new("decoder", Capacity::Unbounded, BlockFlags::default());
    let filter: FrameFifo = Fifo::new("hflip", Capacity::Unbounded, BlockFlags::default());
    let sink: FrameFifo = Fifo::new("encoder", Capacity::Unbounded, blocking_input());
    src.mirror(&filter);
    filter.mirror(&sink);

    let (tx, rx) = mpsc::channel();
    let consumer = {
        let sink = sink.clone();
        thread::spawn(move || {
            // first frame flows normally, then the consumer parks again
            tx.send(sink.pop()).unwrap();
            tx.send(sink.pop()).unwrap();
        })
    };

    let frame = Frame::new(vec![Bytes::from_static(&[0u8; 4])], 2, 2, Some(0));
    src.push(Some(&frame)).unwrap();
    assert!(rx.recv_timeout(TIMEOUT).unwrap().is_some());

    thread::sleep(WAIT);

    // hot swap: drop the blocking policy on the sink, detach the filter,
    // destroy it; the detach wakes the parked consumer, which re-reads
    // the policy and reports end-of-stream
    sink.set_block_flags(BlockFlags::default());
    filter.unmirror_all();
    drop(filter);

    assert!(rx.recv_timeout(TIMEOUT).unwrap().is_none());
    consumer.join().unwrap();

    // wire in the replacement and confirm data flows again
    let replacement: FrameFifo = Fifo::new("vflip", Capacity::Unbounded, BlockFlags::default());
    src.mirror(&replacement);
    replacement.mirror(&sink);

    src.push(Some(&frame)).unwrap();
    assert_eq!(sink.len(), 1);
    assert_eq!(replacement.len(), 1);
    assert!(sink.pop().is_some());
}

/// Items are cloned into queues and released on pop: with an `Arc`
/// payload the strong count returns to its pre-push value.
#[test]
fn test_item_reference_counting() {
    #[derive(Clone)]
    struct Counted(#[allow(dead_code)] Arc<()>);

    let base = Arc::new(());
    let item = Counted(Arc::clone(&base));
    assert_eq!(Arc::strong_count(&base), 2);

    let f: Fifo<Counted> = Fifo::new("f", Capacity::Unbounded, BlockFlags::default());
    f.push(Some(&item)).unwrap();
    assert_eq!(Arc::strong_count(&base), 3);

    let peeked = f.peek().unwrap();
    assert_eq!(Arc::strong_count(&base), 4);
    drop(peeked);

    let popped = f.pop().unwrap();
    assert_eq!(Arc::strong_count(&base), 3);
    drop(popped);
    assert_eq!(Arc::strong_count(&base), 2);
}

/// A miniature pipeline over the concrete carrier types: packets flow
/// from a demuxer queue into a decoder, frames fan out from the decoder.
#[test]
fn test_media_pipeline_end_to_end() {
    let demuxer: PacketFifo = Fifo::new("demuxer", Capacity::Unbounded, BlockFlags::default());
    let decoder_in: PacketFifo = Fifo::new("decoder", Capacity::Bounded(8), BlockFlags::default());
    demuxer.mirror(&decoder_in);

    let packet = Packet::with_timing(&b"keyframe"[..], 0, Some(0), Some(0), true);
    demuxer.push(Some(&packet)).unwrap();

    let received = decoder_in.pop().unwrap();
    assert_eq!(received.data().as_ref(), b"keyframe");
    assert!(received.is_key());

    let decoder_out: FrameFifo = Fifo::new("decoder", Capacity::Unbounded, BlockFlags::default());
    let encoder_in: FrameFifo = Fifo::new("encoder", Capacity::Unbounded, BlockFlags::default());
    decoder_out.mirror(&encoder_in);

    let frame = Frame::new(vec![Bytes::from_static(&[0u8; 16])], 4, 4, Some(0));
    decoder_out.push(Some(&frame)).unwrap();

    // the queued clones share the frame's storage rather than copying it
    let ours = decoder_out.pop().unwrap();
    let theirs = encoder_in.pop().unwrap();
    assert_eq!(ours.pts(), theirs.pts());
    assert_eq!(theirs.plane(0).map(Bytes::len), Some(16));
}

/// End-of-stream: `None` fans out to every downstream without landing in
/// any queue, and parsing the wire-format flag strings round-trips.
#[test]
fn test_eos_and_flag_parsing() {
    let src: PacketFifo = Fifo::new("src", Capacity::Unbounded, BlockFlags::default());
    let down: PacketFifo = Fifo::new("down", Capacity::Unbounded, BlockFlags::default());
    src.mirror(&down);

    src.push(None).unwrap();
    assert!(src.is_empty());
    assert!(down.is_empty());

    let flags: BlockFlags = "block_no_input,pull_no_block".parse().unwrap();
    assert!(flags.block_no_input);
    assert!(flags.pull_no_block);
    assert!(!flags.block_max_output);
    assert!(matches!(
        "bogus".parse::<BlockFlags>(),
        Err(FifoError::UnknownBlockFlag { .. })
    ));
}
