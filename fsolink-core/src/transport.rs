//! The serial byte stream COM-SM runs the link protocol over (§6).

use core::time::Duration;

/// A half-duplex (or full-duplex treated as half-duplex) byte transport.
///
/// Implementors own the actual UART/port configuration; this crate only
/// needs to write bytes, flush, and read with a timeout.
pub trait SerialTransport {
    type Error;

    /// Write all of `data`, blocking until accepted by the peripheral.
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Block until any buffered output has actually left the wire.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Discard any bytes currently buffered for reading, without blocking.
    fn clear_input(&mut self) -> Result<(), Self::Error>;

    /// Read up to `dest.len()` bytes, returning the number read. Returns
    /// `Ok(0)` if `timeout` elapses before any byte arrives; a partial read
    /// (`0 < n < dest.len()`) is also timeout-terminated.
    fn read(&mut self, dest: &mut [u8], timeout: Duration) -> Result<usize, Self::Error>;
}
