//! Error taxonomy (§7, §10.2): link-level errors are recoverable (handled
//! entirely within COM-SM as framing errors); only USB personality
//! install/uninstall failures are fatal to the engine.

use core::fmt;

/// Returned out of [`crate::usb_sm::UsbStateMachine::run`] when a USB
/// personality cannot be installed or torn down. The run loop has no
/// recovery path for this; the caller (board bring-up code) decides whether
/// to reset or halt.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FatalUsbError {
    DeviceInstallFailed,
    DeviceUninstallFailed,
    HostInstallFailed,
    HostUninstallFailed,
}

impl fmt::Display for FatalUsbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FatalUsbError::DeviceInstallFailed => "USB device personality failed to install",
            FatalUsbError::DeviceUninstallFailed => "USB device personality failed to uninstall",
            FatalUsbError::HostInstallFailed => "USB host personality failed to install",
            FatalUsbError::HostUninstallFailed => "USB host personality failed to uninstall",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FatalUsbError {}
