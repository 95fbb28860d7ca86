//! Framing on top of the Hamming-coded byte stream (§3, grounded on the
//! original `send_header`/`send_data`/`read_header`/`read_data` contract).

use crate::config::PAYLOAD_READ_TIMEOUT;
use crate::hamming;
use crate::messages::{Header, Slot};
use crate::transport::SerialTransport;
use core::time::Duration;

/// A `SerialTransport` wrapped with Hamming(7,4) framing.
pub struct FramedLink<T> {
    transport: T,
}

impl<T: SerialTransport> FramedLink<T> {
    pub fn new(transport: T) -> FramedLink<T> {
        FramedLink { transport }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn flush(&mut self) -> Result<(), T::Error> {
        self.transport.flush()
    }

    pub fn clear_input(&mut self) -> Result<(), T::Error> {
        self.transport.clear_input()
    }

    /// Write just a header byte with no payload (HELLO, HEARD, ACK).
    pub fn send_header(&mut self, header: Header) -> Result<(), T::Error> {
        let carriers = hamming::encode_byte(header as u8);
        self.transport.write(&carriers)?;
        self.transport.flush()
    }

    /// Write a full slot: header plus its wire-length payload.
    pub fn send_message(&mut self, slot: &Slot) -> Result<(), T::Error> {
        let mut carriers = [0u8; 2 * (1 + crate::config::MAX_PAYLOAD_BYTES)];
        let payload = slot.payload();
        let total_bytes = 1 + payload.len();
        let carrier_len = 2 * total_bytes;

        let header_carriers = hamming::encode_byte(slot.header as u8);
        carriers[0] = header_carriers[0];
        carriers[1] = header_carriers[1];
        hamming::encode_bytes(payload, &mut carriers[2..carrier_len]);

        self.transport.write(&carriers[..carrier_len])?;
        self.transport.flush()
    }

    /// Read and decode one header byte, waiting up to `timeout`.
    ///
    /// Returns `Header::NoHeader` if nothing arrived at all, `Header::Error`
    /// if exactly one carrier arrived (a short read is a framing error, §4.2,
    /// §7), or the decoded byte if both carriers arrived (itself
    /// `Header::Error` if it's outside the known alphabet).
    pub fn read_header(&mut self, timeout: Duration) -> Result<Header, T::Error> {
        let mut carriers = [0u8; 2];
        let n = self.transport.read(&mut carriers, timeout)?;
        if n == 0 {
            return Ok(Header::NoHeader);
        }
        if n == 1 {
            return Ok(Header::Error);
        }
        Ok(Header::from_wire(hamming::decode_byte(carriers)))
    }

    /// Read the payload that follows a header already identified as needing
    /// one. Returns `None` if the payload doesn't arrive within the fixed
    /// per-payload timeout (§7: treated identically to a framing error).
    pub fn read_payload(&mut self, header: Header) -> Result<Option<Slot>, T::Error> {
        let len = header.payload_len();
        if len == 0 {
            return Ok(Some(Slot::from_parts(header, &[])));
        }

        let mut carriers = [0u8; 2 * crate::config::MAX_PAYLOAD_BYTES];
        let carrier_len = 2 * len;
        let n = self
            .transport
            .read(&mut carriers[..carrier_len], PAYLOAD_READ_TIMEOUT)?;
        if n < carrier_len {
            return Ok(None);
        }

        let mut payload = [0u8; crate::config::MAX_PAYLOAD_BYTES];
        hamming::decode_bytes(&carriers[..carrier_len], &mut payload[..len]);
        Ok(Some(Slot::from_parts(header, &payload[..len])))
    }
}
