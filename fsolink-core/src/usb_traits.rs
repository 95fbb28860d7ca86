//! The platform boundary USB-SM drives (§4.4.1, §6): installing/uninstalling
//! a USB device or host personality, and polling whichever is active for the
//! events that drive role transitions.

use crate::error::FatalUsbError;
use crate::messages::{DeviceClass, KeyboardReport, MouseReport};
use core::time::Duration;

/// A report read off a locally-attached physical peripheral.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportEvent {
    Mouse(MouseReport),
    Keyboard(KeyboardReport),
}

/// The DEVICE-role stack (§6): we present ourselves as a HID device to a
/// downstream computer physically plugged into this endpoint, sending it
/// reports that in fact originated on the paired bridge endpoint.
///
/// `install` is called once at startup with [`DeviceClass::None`] — a
/// keyboard-shaped placeholder descriptor, so a downstream computer has
/// *something* to enumerate before we know what we're bridging — and again
/// whenever USB-SM learns the peer's real peripheral class, to re-enumerate
/// with the matching descriptor.
pub trait DevicePersonality {
    fn install(&mut self, class: DeviceClass) -> Result<(), FatalUsbError>;
    fn uninstall(&mut self) -> Result<(), FatalUsbError>;

    /// True once the downstream computer has enumerated us.
    fn is_attached(&mut self) -> bool;

    fn send_mouse_report(&mut self, report: MouseReport);
    fn send_keyboard_report(&mut self, report: KeyboardReport);
}

/// The HOST-role stack (§6): we act as a USB host for whatever physical HID
/// peripheral is plugged into this endpoint, detecting its class and reading
/// its reports so they can be relayed over the link.
pub trait HostPersonality {
    fn install(&mut self) -> Result<(), FatalUsbError>;
    fn uninstall(&mut self) -> Result<(), FatalUsbError>;

    /// Non-blocking poll for which peripheral class is attached.
    /// `DeviceClass::None` means nothing is attached (yet, or any more).
    fn detect_device(&mut self) -> DeviceClass;

    /// Poll for the next report from the attached peripheral, waiting up to
    /// `timeout`.
    fn poll_report(&mut self, timeout: Duration) -> Option<ReportEvent>;
}
