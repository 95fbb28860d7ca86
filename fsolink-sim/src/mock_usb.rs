//! Scripted stand-ins for the real USB device/host stacks (§6), driven by
//! the scenario director in `main.rs` rather than actual hardware.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fsolink_core::error::FatalUsbError;
use fsolink_core::messages::{DeviceClass, KeyboardReport, MouseReport};
use fsolink_core::usb_traits::{DevicePersonality, HostPersonality, ReportEvent};
use log::info;

fn class_to_byte(class: DeviceClass) -> u8 {
    match class {
        DeviceClass::None => 0,
        DeviceClass::Mouse => 1,
        DeviceClass::Keyboard => 2,
        DeviceClass::Datastick => 3,
    }
}

fn byte_to_class(byte: u8) -> DeviceClass {
    match byte {
        1 => DeviceClass::Mouse,
        2 => DeviceClass::Keyboard,
        3 => DeviceClass::Datastick,
        _ => DeviceClass::None,
    }
}

/// A HID device personality standing in for a downstream computer's view of
/// this endpoint. `set_attached` is the director's hook to simulate a USB
/// cable being plugged in.
#[derive(Clone)]
pub struct MockDevice {
    label: &'static str,
    installed_as: Arc<Mutex<Option<DeviceClass>>>,
    attached: Arc<AtomicBool>,
}

impl MockDevice {
    pub fn new(label: &'static str) -> MockDevice {
        MockDevice {
            label,
            installed_as: Arc::new(Mutex::new(None)),
            attached: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::Release);
    }
}

impl DevicePersonality for MockDevice {
    fn install(&mut self, class: DeviceClass) -> Result<(), FatalUsbError> {
        info!("[{}] device personality installed as {:?}", self.label, class);
        *self.installed_as.lock().unwrap() = Some(class);
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), FatalUsbError> {
        info!("[{}] device personality uninstalled", self.label);
        *self.installed_as.lock().unwrap() = None;
        Ok(())
    }

    fn is_attached(&mut self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn send_mouse_report(&mut self, report: MouseReport) {
        info!("[{}] -> downstream computer: {:?}", self.label, report);
    }

    fn send_keyboard_report(&mut self, report: KeyboardReport) {
        info!("[{}] -> downstream computer: {:?}", self.label, report);
    }
}

/// A USB host personality standing in for a physically-attached peripheral.
/// `set_class` is the director's hook to simulate plugging in a mouse,
/// keyboard or datastick; once the class is `Mouse`, `poll_report` manu-
/// factures a small synthetic jitter movement on every call so there is
/// something to forward (scenario S4).
#[derive(Clone)]
pub struct MockHost {
    label: &'static str,
    installed: Arc<AtomicBool>,
    class: Arc<AtomicU8>,
    tick: Arc<AtomicU8>,
}

impl MockHost {
    pub fn new(label: &'static str) -> MockHost {
        MockHost {
            label,
            installed: Arc::new(AtomicBool::new(false)),
            class: Arc::new(AtomicU8::new(class_to_byte(DeviceClass::None))),
            tick: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn set_class(&self, class: DeviceClass) {
        self.class.store(class_to_byte(class), Ordering::Release);
    }
}

impl HostPersonality for MockHost {
    fn install(&mut self) -> Result<(), FatalUsbError> {
        info!("[{}] host stack installed", self.label);
        self.installed.store(true, Ordering::Release);
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), FatalUsbError> {
        info!("[{}] host stack uninstalled", self.label);
        self.installed.store(false, Ordering::Release);
        Ok(())
    }

    fn detect_device(&mut self) -> DeviceClass {
        byte_to_class(self.class.load(Ordering::Acquire))
    }

    fn poll_report(&mut self, timeout: Duration) -> Option<ReportEvent> {
        if byte_to_class(self.class.load(Ordering::Acquire)) != DeviceClass::Mouse {
            std::thread::sleep(timeout);
            return None;
        }
        std::thread::sleep(timeout);
        let t = self.tick.fetch_add(1, Ordering::Relaxed);
        let dx = ((t % 11) as i8) - 5;
        Some(ReportEvent::Mouse(MouseReport {
            buttons: 0,
            dx,
            dy: -dx,
            wheel: 0,
        }))
    }
}
