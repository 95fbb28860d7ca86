//! USB role coordination (component C / §5): the mutually exclusive roles a
//! bridge endpoint can be in, and the mirror relation between the two ends
//! of a link.

use core::sync::atomic::{AtomicU8, Ordering};

/// The nine mutually exclusive roles a bridge endpoint can occupy.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UsbRole {
    Unknown = 0,
    DeviceUnknown = 1,
    DeviceDatastick = 2,
    DeviceKeyboard = 3,
    DeviceMouse = 4,
    HostUnknown = 5,
    HostDatastick = 6,
    HostKeyboard = 7,
    HostMouse = 8,
}

impl UsbRole {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<UsbRole> {
        Some(match byte {
            0 => UsbRole::Unknown,
            1 => UsbRole::DeviceUnknown,
            2 => UsbRole::DeviceDatastick,
            3 => UsbRole::DeviceKeyboard,
            4 => UsbRole::DeviceMouse,
            5 => UsbRole::HostUnknown,
            6 => UsbRole::HostDatastick,
            7 => UsbRole::HostKeyboard,
            8 => UsbRole::HostMouse,
            _ => return None,
        })
    }

    /// The role our peer should be in for the link to be considered
    /// consistent, i.e. device-side roles mirror to the matching host-side
    /// role and vice versa (§5). `UNKNOWN` mirrors to itself.
    pub fn mirror(self) -> UsbRole {
        match self {
            UsbRole::Unknown => UsbRole::Unknown,
            UsbRole::DeviceUnknown => UsbRole::HostUnknown,
            UsbRole::DeviceDatastick => UsbRole::HostDatastick,
            UsbRole::DeviceKeyboard => UsbRole::HostKeyboard,
            UsbRole::DeviceMouse => UsbRole::HostMouse,
            UsbRole::HostUnknown => UsbRole::DeviceUnknown,
            UsbRole::HostDatastick => UsbRole::DeviceDatastick,
            UsbRole::HostKeyboard => UsbRole::DeviceKeyboard,
            UsbRole::HostMouse => UsbRole::DeviceMouse,
        }
    }

    pub fn is_device_side(self) -> bool {
        matches!(
            self,
            UsbRole::DeviceUnknown
                | UsbRole::DeviceDatastick
                | UsbRole::DeviceKeyboard
                | UsbRole::DeviceMouse
        )
    }

    pub fn is_host_side(self) -> bool {
        matches!(
            self,
            UsbRole::HostUnknown | UsbRole::HostDatastick | UsbRole::HostKeyboard | UsbRole::HostMouse
        )
    }
}

/// Shared, atomically-updated store for the local `usb_state` (§5):
/// USB-SM writes it as its role changes, COM-SM reads it to build `STATE`
/// messages. A plain `AtomicU8` rather than a mutex, since the two tasks run
/// on different cores and only ever need the latest value.
#[derive(Default)]
pub struct RoleCell(AtomicU8);

impl RoleCell {
    pub const fn new(initial: UsbRole) -> RoleCell {
        RoleCell(AtomicU8::new(initial as u8))
    }

    pub fn get(&self) -> UsbRole {
        UsbRole::from_byte(self.0.load(Ordering::Acquire)).unwrap_or(UsbRole::Unknown)
    }

    pub fn set(&self, role: UsbRole) {
        self.0.store(role.to_byte(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_is_its_own_inverse() {
        let all = [
            UsbRole::Unknown,
            UsbRole::DeviceUnknown,
            UsbRole::DeviceDatastick,
            UsbRole::DeviceKeyboard,
            UsbRole::DeviceMouse,
            UsbRole::HostUnknown,
            UsbRole::HostDatastick,
            UsbRole::HostKeyboard,
            UsbRole::HostMouse,
        ];
        for role in all {
            assert_eq!(role.mirror().mirror(), role);
        }
    }

    #[test]
    fn mirror_crosses_device_host_boundary() {
        assert_eq!(UsbRole::DeviceMouse.mirror(), UsbRole::HostMouse);
        assert_eq!(UsbRole::HostKeyboard.mirror(), UsbRole::DeviceKeyboard);
        assert_eq!(UsbRole::Unknown.mirror(), UsbRole::Unknown);
    }

    #[test]
    fn role_cell_round_trips_through_byte_encoding() {
        let cell = RoleCell::new(UsbRole::Unknown);
        assert_eq!(cell.get(), UsbRole::Unknown);
        cell.set(UsbRole::HostMouse);
        assert_eq!(cell.get(), UsbRole::HostMouse);
    }
}
