//! An in-process duplex byte pipe standing in for the half-duplex UART of
//! §6, so two [`fsolink_core::com_sm::ComStateMachine`]s can rendezvous
//! without real hardware.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use fsolink_core::transport::SerialTransport;

#[derive(Debug)]
pub struct PipeClosed;

impl fmt::Display for PipeClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fsolink-sim pipe closed")
    }
}

impl std::error::Error for PipeClosed {}

/// One end of a duplex pipe: bytes written here arrive at the peer's `rx`,
/// and bytes the peer writes arrive at our `rx`.
pub struct PipeEnd {
    tx: Sender<u8>,
    rx: Mutex<Receiver<u8>>,
}

/// Build the two ends of a duplex pipe.
pub fn duplex() -> (PipeEnd, PipeEnd) {
    let (a_tx, b_rx) = mpsc::channel();
    let (b_tx, a_rx) = mpsc::channel();
    (
        PipeEnd { tx: a_tx, rx: Mutex::new(a_rx) },
        PipeEnd { tx: b_tx, rx: Mutex::new(b_rx) },
    )
}

impl PipeEnd {
    /// A cheap, independently-ownable handle for writing raw bytes onto this
    /// end's outgoing wire, bypassing `FramedLink` entirely. Lets a scenario
    /// director inject framing errors or bogus messages (S5/S6) from a
    /// separate thread after the `PipeEnd` itself has been moved into a
    /// `ComStateMachine`.
    pub fn injector(&self) -> Injector {
        Injector { tx: self.tx.clone() }
    }
}

#[derive(Clone)]
pub struct Injector {
    tx: Sender<u8>,
}

impl Injector {
    pub fn inject(&self, bytes: &[u8]) {
        for &b in bytes {
            let _ = self.tx.send(b);
        }
    }
}

impl SerialTransport for PipeEnd {
    type Error = PipeClosed;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        for &b in data {
            self.tx.send(b).map_err(|_| PipeClosed)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        let rx = self.rx.lock().unwrap();
        while rx.try_recv().is_ok() {}
        Ok(())
    }

    fn read(&mut self, dest: &mut [u8], timeout: Duration) -> Result<usize, Self::Error> {
        if dest.is_empty() {
            return Ok(0);
        }
        let rx = self.rx.lock().unwrap();
        let first = match rx.recv_timeout(timeout) {
            Ok(b) => b,
            Err(mpsc::RecvTimeoutError::Timeout) => return Ok(0),
            Err(mpsc::RecvTimeoutError::Disconnected) => return Err(PipeClosed),
        };
        dest[0] = first;
        let mut n = 1;
        while n < dest.len() {
            match rx.try_recv() {
                Ok(b) => {
                    dest[n] = b;
                    n += 1;
                }
                Err(_) => break,
            }
        }
        Ok(n)
    }
}
