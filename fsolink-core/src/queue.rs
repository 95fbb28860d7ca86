//! The two inter-task queues, `usb_to_com` and `com_to_usb` (§5, §7).
//!
//! `usb_to_com` (USB-SM's outgoing messages) mixes send disciplines on the
//! *same* queue: `UPDATE` always blocks until there is room, while HID
//! reports are dropped under backpressure. `com_to_usb` (COM-SM's decoded
//! inbound messages, of any kind) always blocks — protocol message loss in
//! that direction is not acceptable. The trait exposes both primitives;
//! callers choose per call and per direction.

use core::time::Duration;

pub trait BoundedQueue<T> {
    /// Block until `item` is enqueued.
    fn send(&self, item: T);

    /// Enqueue `item` only if there is room right now. Returns `false` (and
    /// drops `item`) if the queue is full.
    fn try_send(&self, item: T) -> bool;

    /// Block up to `timeout` for an item. Returns `None` on timeout.
    fn recv_timeout(&self, timeout: Duration) -> Option<T>;

    /// Non-blocking receive.
    fn try_recv(&self) -> Option<T> {
        self.recv_timeout(Duration::from_millis(0))
    }
}

#[cfg(feature = "std")]
pub use std_queue::StdQueue;

#[cfg(feature = "std")]
mod std_queue {
    use super::BoundedQueue;
    use core::time::Duration;
    use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
    use std::sync::Mutex;

    /// A `BoundedQueue` backed by `std::sync::mpsc::sync_channel`, for tests
    /// and `fsolink-sim`.
    pub struct StdQueue<T> {
        tx: SyncSender<T>,
        rx: Mutex<Receiver<T>>,
    }

    impl<T> StdQueue<T> {
        pub fn new(capacity: usize) -> StdQueue<T> {
            let (tx, rx) = sync_channel(capacity);
            StdQueue {
                tx,
                rx: Mutex::new(rx),
            }
        }
    }

    impl<T> BoundedQueue<T> for StdQueue<T> {
        fn send(&self, item: T) {
            // The receiving task never outlives the sender in any of our
            // tests or the sim binary, so a closed channel can't happen.
            self.tx.send(item).expect("usb/com queue peer dropped");
        }

        fn try_send(&self, item: T) -> bool {
            match self.tx.try_send(item) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => false,
                Err(TrySendError::Disconnected(_)) => false,
            }
        }

        fn recv_timeout(&self, timeout: Duration) -> Option<T> {
            self.rx.lock().unwrap().recv_timeout(timeout).ok()
        }
    }
}

/// `usb_to_com` and `com_to_usb` each have exactly one sender task and one
/// receiver task (§5), so wiring a real pair of state machines onto the
/// same queue needs shared ownership. `Arc` forwards the trait straight to
/// the underlying queue.
#[cfg(feature = "std")]
impl<T, Q: BoundedQueue<T>> BoundedQueue<T> for std::sync::Arc<Q> {
    fn send(&self, item: T) {
        (**self).send(item)
    }

    fn try_send(&self, item: T) -> bool {
        (**self).try_send(item)
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        (**self).recv_timeout(timeout)
    }
}

/// When two state machines are pinned to `std::thread::scope` threads
/// rather than spawned with `'static` ownership, a plain borrow of a
/// stack-allocated queue is enough to share it; no `Arc` needed.
impl<T, Q: BoundedQueue<T>> BoundedQueue<T> for &Q {
    fn send(&self, item: T) {
        (**self).send(item)
    }

    fn try_send(&self, item: T) -> bool {
        (**self).try_send(item)
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        (**self).recv_timeout(timeout)
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn try_send_drops_when_full() {
        let q: StdQueue<u8> = StdQueue::new(1);
        assert!(q.try_send(1));
        assert!(!q.try_send(2));
        assert_eq!(q.recv_timeout(Duration::from_millis(10)), Some(1));
    }

    #[test]
    fn recv_timeout_returns_none_when_empty() {
        let q: StdQueue<u8> = StdQueue::new(1);
        assert_eq!(q.recv_timeout(Duration::from_millis(5)), None);
    }

    #[test]
    fn send_and_recv_round_trip() {
        let q: StdQueue<u8> = StdQueue::new(4);
        q.send(42);
        assert_eq!(q.recv_timeout(Duration::from_millis(10)), Some(42));
    }
}
