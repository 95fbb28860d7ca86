//! Compile-time protocol constants (§6 of the spec).
//!
//! Durations are plain `core::time::Duration` so this module has no
//! dependency on any particular time or executor crate.

use core::time::Duration;

/// UART baud rate the link runs at. Informational for this crate (the
/// concrete transport owns the actual port configuration) but kept here as
/// the single place all of the protocol's compile-time numbers live.
pub const BAUD_RATE: u32 = 1_000_000;

/// Heartbeat period: the WRITE-state blocking wait for hosts/unknown, and
/// half of the READ-state timeout.
pub const HB_PERIOD: Duration = Duration::from_millis(1000);

/// READ-state timeout is twice the heartbeat period.
pub const READ_TIMEOUT: Duration = Duration::from_millis(2 * HB_PERIOD.as_millis() as u64);

/// Lower bound of the BACKOFF rendezvous timeout.
pub const MIN_BACKOFF: Duration = Duration::from_millis(100);

/// Upper bound of the BACKOFF rendezvous timeout.
pub const MAX_BACKOFF: Duration = Duration::from_millis(1000);

/// Delay at BACKOFF entry before flushing, to avoid reading a reflected
/// transmission of our own.
pub const BACKOFF_ENTRY_DELAY: Duration = Duration::from_millis(10);

/// Delay before replying in BACKOFF, to give the peer time to flush.
pub const BACKOFF_REPLY_DELAY: Duration = Duration::from_millis(15);

/// Timeout used for the payload reads that follow a recognised header in
/// READ (all of `UPDATE`, `REPORT_MOUSE`, `REPORT_KEYBOARD`, `STATE`).
pub const PAYLOAD_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Settle time after switching device personality, to allow USB enumeration
/// to complete before the state behaviour of the new role runs.
pub const ENUMERATION_SETTLE: Duration = Duration::from_millis(1000);

/// USB-SM's wait when dequeuing from `com_to_usb` while not in `UNKNOWN`.
pub const USB_SM_POLL: Duration = Duration::from_millis(10);

/// Depth of each of the two inter-task queues.
pub const QUEUE_DEPTH: usize = 10;

/// Size in bytes of a queue slot: 1 header byte + up to 8 payload bytes
/// (the keyboard report is the worst case).
pub const QUEUE_SLOT_BYTES: usize = 9;

/// Maximum payload length, in bytes, of any message (the keyboard report).
pub const MAX_PAYLOAD_BYTES: usize = QUEUE_SLOT_BYTES - 1;
