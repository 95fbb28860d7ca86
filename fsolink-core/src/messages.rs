//! Wire message shapes (§3.1) and the fixed-capacity queue slot they travel
//! in between the two state machines and across the link.

use crate::config::MAX_PAYLOAD_BYTES;
use crate::role::UsbRole;

/// Header byte alphabet. `NoHeader` and `Error` are reader-produced
/// sentinels and are never written to the wire.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Header {
    NoHeader = 0,
    Error = 1,
    Hello = 2,
    Heard = 3,
    Ack = 4,
    State = 5,
    Update = 6,
    ReportMouse = 7,
    ReportKeyboard = 8,
}

impl Header {
    /// Decode a raw byte read off the wire. Any value outside the known
    /// alphabet is treated the same as a framing error.
    pub fn from_wire(byte: u8) -> Header {
        match byte {
            2 => Header::Hello,
            3 => Header::Heard,
            4 => Header::Ack,
            5 => Header::State,
            6 => Header::Update,
            7 => Header::ReportMouse,
            8 => Header::ReportKeyboard,
            _ => Header::Error,
        }
    }

    /// Number of semantic payload bytes that follow this header on the wire.
    pub fn payload_len(self) -> usize {
        match self {
            Header::NoHeader | Header::Error | Header::Hello | Header::Heard | Header::Ack => 0,
            Header::State | Header::Update => 1,
            Header::ReportMouse => 4,
            Header::ReportKeyboard => 8,
        }
    }
}

/// Payload of an `UPDATE` message (§3.1).
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UpdateKind {
    HostConnected = 0,
    HostDisconnected = 1,
    MouseConnected = 2,
    KeyboardConnected = 3,
    DatastickConnected = 4,
    DeviceDisconnected = 5,
}

impl UpdateKind {
    pub fn from_byte(byte: u8) -> Option<UpdateKind> {
        Some(match byte {
            0 => UpdateKind::HostConnected,
            1 => UpdateKind::HostDisconnected,
            2 => UpdateKind::MouseConnected,
            3 => UpdateKind::KeyboardConnected,
            4 => UpdateKind::DatastickConnected,
            5 => UpdateKind::DeviceDisconnected,
            _ => return None,
        })
    }
}

/// Which class of device the host side currently sees attached (§6), kept as
/// a distinct type from [`UsbRole`] per the Design Notes — the two "NONE"
/// concepts are never allowed to alias.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceClass {
    #[default]
    None,
    Mouse,
    Keyboard,
    Datastick,
}

/// A USB mouse HID report (§6).
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    pub buttons: u8,
    pub dx: i8,
    pub dy: i8,
    pub wheel: i8,
}

impl MouseReport {
    pub fn to_bytes(self) -> [u8; 4] {
        [self.buttons, self.dx as u8, self.dy as u8, self.wheel as u8]
    }

    pub fn from_bytes(b: [u8; 4]) -> MouseReport {
        MouseReport {
            buttons: b[0],
            dx: b[1] as i8,
            dy: b[2] as i8,
            wheel: b[3] as i8,
        }
    }
}

/// A USB keyboard HID report (§6).
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = self.modifier;
        out[1] = self.reserved;
        out[2..8].copy_from_slice(&self.keycodes);
        out
    }

    pub fn from_bytes(b: [u8; 8]) -> KeyboardReport {
        let mut keycodes = [0u8; 6];
        keycodes.copy_from_slice(&b[2..8]);
        KeyboardReport {
            modifier: b[0],
            reserved: b[1],
            keycodes,
        }
    }
}

/// A queue slot: one header byte plus up to [`MAX_PAYLOAD_BYTES`] of payload.
/// This is the tagged-union representation the Design Notes call out as one
/// of the two acceptable shapes for the fixed-capacity/variable-length slot.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot {
    pub header: Header,
    payload: [u8; MAX_PAYLOAD_BYTES],
}

impl Slot {
    pub fn ack() -> Slot {
        Slot {
            header: Header::Ack,
            payload: [0; MAX_PAYLOAD_BYTES],
        }
    }

    pub fn hello() -> Slot {
        Slot {
            header: Header::Hello,
            payload: [0; MAX_PAYLOAD_BYTES],
        }
    }

    pub fn heard() -> Slot {
        Slot {
            header: Header::Heard,
            payload: [0; MAX_PAYLOAD_BYTES],
        }
    }

    pub fn state(role: UsbRole) -> Slot {
        let mut payload = [0; MAX_PAYLOAD_BYTES];
        payload[0] = role.to_byte();
        Slot {
            header: Header::State,
            payload,
        }
    }

    pub fn update(kind: UpdateKind) -> Slot {
        let mut payload = [0; MAX_PAYLOAD_BYTES];
        payload[0] = kind as u8;
        Slot {
            header: Header::Update,
            payload,
        }
    }

    pub fn mouse(report: MouseReport) -> Slot {
        let mut payload = [0; MAX_PAYLOAD_BYTES];
        payload[..4].copy_from_slice(&report.to_bytes());
        Slot {
            header: Header::ReportMouse,
            payload,
        }
    }

    pub fn keyboard(report: KeyboardReport) -> Slot {
        let mut payload = [0; MAX_PAYLOAD_BYTES];
        payload[..8].copy_from_slice(&report.to_bytes());
        Slot {
            header: Header::ReportKeyboard,
            payload,
        }
    }

    /// Build a slot from a header and its already-read payload bytes. Only
    /// the first `header.payload_len()` bytes of `payload` are meaningful.
    pub fn from_parts(header: Header, payload: &[u8]) -> Slot {
        let mut buf = [0; MAX_PAYLOAD_BYTES];
        let len = header.payload_len().min(payload.len());
        buf[..len].copy_from_slice(&payload[..len]);
        Slot {
            header,
            payload: buf,
        }
    }

    /// The semantic payload bytes, i.e. `payload()[..header.payload_len()]`
    /// is meaningful; anything past that is undefined per §3.3.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.header.payload_len()]
    }

    pub fn as_update(&self) -> Option<UpdateKind> {
        if self.header != Header::Update {
            return None;
        }
        UpdateKind::from_byte(self.payload[0])
    }

    pub fn as_state(&self) -> Option<UsbRole> {
        if self.header != Header::State {
            return None;
        }
        UsbRole::from_byte(self.payload[0])
    }

    pub fn as_mouse(&self) -> Option<MouseReport> {
        if self.header != Header::ReportMouse {
            return None;
        }
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.payload[..4]);
        Some(MouseReport::from_bytes(b))
    }

    pub fn as_keyboard(&self) -> Option<KeyboardReport> {
        if self.header != Header::ReportKeyboard {
            return None;
        }
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.payload[..8]);
        Some(KeyboardReport::from_bytes(b))
    }
}
