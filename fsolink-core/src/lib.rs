//! FSO-link protocol engine: the two state machines and the framed,
//! Hamming-coded link that two USB-HID bridge endpoints run over a
//! half-duplex UART to mirror a HID peripheral across a point-to-point link.
//!
//! Everything this crate touches outside its own state — the serial port,
//! the USB device/host stacks, the inter-task queues, delays and randomness
//! — is a trait ([`transport::SerialTransport`], [`usb_traits::DevicePersonality`],
//! [`usb_traits::HostPersonality`], [`queue::BoundedQueue`],
//! [`embedded_hal::delay::DelayNs`], [`rand_core::RngCore`]), so the engine
//! itself builds and tests on a workstation with no board attached.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[cfg(not(any(feature = "std", test)))]
extern crate core as std;

pub mod com_sm;
pub mod config;
pub mod error;
pub mod hamming;
pub mod link;
pub mod logging;
pub mod messages;
pub mod queue;
pub mod role;
pub mod transport;
pub mod usb_sm;
pub mod usb_traits;

pub use com_sm::{ComState, ComStateMachine};
pub use error::FatalUsbError;
pub use messages::{DeviceClass, Header, KeyboardReport, MouseReport, Slot, UpdateKind};
pub use role::{RoleCell, UsbRole};
pub use usb_sm::UsbStateMachine;
