//! COM-SM: the half-duplex rendezvous and turn-taking state machine (§4.3).
//!
//! Two peers run this independently over a shared half-duplex UART. BACKOFF
//! decides who transmits first; afterwards READ and WRITE simply alternate,
//! with the link idle between turns either carrying a substantive message or
//! a bare ACK heartbeat that passes the turn without saying anything.

use crate::config::{
    BACKOFF_ENTRY_DELAY, BACKOFF_REPLY_DELAY, HB_PERIOD, MAX_BACKOFF, MIN_BACKOFF, READ_TIMEOUT,
};
use crate::link::FramedLink;
use crate::logging::debug;
use crate::messages::{Header, Slot};
use crate::queue::BoundedQueue;
use crate::role::{RoleCell, UsbRole};
use crate::transport::SerialTransport;
use core::time::Duration;
use embedded_hal::delay::DelayNs;
use rand_core::RngCore;

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComState {
    Backoff,
    Read,
    Write,
}

/// Drives one bridge endpoint's half of the link protocol.
///
/// `Qout` is `usb_to_com` (messages USB-SM wants transmitted); `Qin` is
/// `com_to_usb` (messages decoded off the wire, for USB-SM to dispatch).
/// `role` is the same [`RoleCell`] USB-SM writes to (§3.4, §5); COM-SM only
/// ever reads it, to build `STATE` payloads and to pick the WRITE-state
/// blocking discipline.
pub struct ComStateMachine<'a, T, Qout, Qin, D, R> {
    link: FramedLink<T>,
    usb_to_com: Qout,
    com_to_usb: Qin,
    delay: D,
    rng: R,
    role: &'a RoleCell,
    state: ComState,
}

impl<'a, T, Qout, Qin, D, R> ComStateMachine<'a, T, Qout, Qin, D, R>
where
    T: SerialTransport,
    Qout: BoundedQueue<Slot>,
    Qin: BoundedQueue<Slot>,
    D: DelayNs,
    R: RngCore,
{
    pub fn new(transport: T, usb_to_com: Qout, com_to_usb: Qin, delay: D, rng: R, role: &'a RoleCell) -> Self {
        ComStateMachine {
            link: FramedLink::new(transport),
            usb_to_com,
            com_to_usb,
            delay,
            rng,
            role,
            state: ComState::Backoff,
        }
    }

    pub fn state(&self) -> ComState {
        self.state
    }

    /// Drive BACKOFF/READ/WRITE transitions forever. Board bring-up code
    /// pins this to its own core/task per §2.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// Execute whichever of BACKOFF/READ/WRITE `self.state` currently names,
    /// updating `self.state` for the next call. Split out from [`Self::run`]
    /// so tests can drive a bounded number of steps.
    pub fn step(&mut self) {
        self.state = match self.state {
            ComState::Backoff => self.backoff(),
            ComState::Read => self.read(),
            ComState::Write => self.write(),
        };
    }

    fn jittered_backoff(&mut self) -> Duration {
        let span = (MAX_BACKOFF.as_millis() - MIN_BACKOFF.as_millis()) as u32;
        let jitter = if span == 0 { 0 } else { self.rng.next_u32() % span };
        Duration::from_millis(MIN_BACKOFF.as_millis() as u64 + jitter as u64)
    }

    fn read_header(&mut self, timeout: Duration) -> Header {
        // A transport fault is indistinguishable from a framing error here
        // (§7): both just restart rendezvous.
        self.link.read_header(timeout).unwrap_or(Header::Error)
    }

    /// Cold rendezvous (scenario S2) and resync after any desync trigger
    /// (read timeout, framing error, unexpected header mid-turn).
    fn backoff(&mut self) -> ComState {
        // Let any reflection of our own last transmission clear the line
        // before we start listening.
        self.delay.delay_ms(BACKOFF_ENTRY_DELAY.as_millis() as u32);
        let _ = self.link.clear_input();

        let wait = self.jittered_backoff();
        match self.read_header(wait) {
            Header::Hello => {
                self.delay.delay_ms(BACKOFF_REPLY_DELAY.as_millis() as u32);
                let _ = self.link.send_header(Header::Heard);
                ComState::Read
            }
            Header::Heard => {
                // Our own HELLO (from a previous BACKOFF pass) was heard;
                // this STATE send is the link's first real "turn", after
                // which we listen for the peer's reaction to it.
                self.delay.delay_ms(BACKOFF_REPLY_DELAY.as_millis() as u32);
                let _ = self.link.send_message(&Slot::state(self.role.get()));
                ComState::Read
            }
            Header::NoHeader | Header::Error | _ => {
                self.delay.delay_ms(BACKOFF_REPLY_DELAY.as_millis() as u32);
                let _ = self.link.send_header(Header::Hello);
                ComState::Backoff
            }
        }
    }

    fn read(&mut self) -> ComState {
        let _ = self.link.clear_input();
        match self.read_header(READ_TIMEOUT) {
            Header::NoHeader | Header::Error | Header::Hello | Header::Heard => ComState::Backoff,
            Header::Ack => ComState::Write,
            Header::State => self.read_state(),
            header @ Header::Update => match self.link.read_payload(header) {
                Ok(Some(slot)) => {
                    self.com_to_usb.send(slot);
                    ComState::Write
                }
                _ => ComState::Backoff,
            },
            header @ (Header::ReportMouse | Header::ReportKeyboard) => {
                match self.link.read_payload(header) {
                    Ok(Some(slot)) => {
                        self.com_to_usb.send(slot);
                        ComState::Write
                    }
                    _ => ComState::Backoff,
                }
            }
        }
    }

    /// §4.3 READ/STATE row: compare the peer's asserted role against the
    /// mirror of our own. A match just passes the turn; a mismatch re-
    /// asserts our own STATE and tells USB-SM (via `com_to_usb`) to abort to
    /// `UNKNOWN`, forcing both ends to renegotiate (scenario S5).
    fn read_state(&mut self) -> ComState {
        let payload = match self.link.read_payload(Header::State) {
            Ok(Some(slot)) => slot,
            _ => return ComState::Backoff,
        };

        let desired = self.role.get().mirror();
        if payload.as_state() == Some(desired) {
            return ComState::Write;
        }

        debug!("peer STATE mismatch, re-asserting and aborting to UNKNOWN");
        let _ = self.link.send_message(&Slot::state(self.role.get()));
        self.com_to_usb.send(payload);
        ComState::Write
    }

    fn write(&mut self) -> ComState {
        let pending = if self.role.get().is_device_side() {
            // The peer is the one consuming our reports; don't hold up the
            // turn waiting for USB-SM to produce one.
            self.usb_to_com.try_recv()
        } else {
            self.usb_to_com.recv_timeout(HB_PERIOD)
        };

        match pending {
            Some(slot) => {
                let _ = self.link.send_message(&slot);
            }
            None => {
                let _ = self.link.send_header(Header::Ack);
            }
        }
        ComState::Read
    }
}
