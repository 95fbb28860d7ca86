//! USB-SM: USB role coordination (§4.4). Decides, from local attach/detach
//! evidence and instructions relayed from the peer, which of the nine
//! mutually exclusive [`UsbRole`]s this bridge endpoint currently holds, and
//! installs/uninstalls the matching USB personality as it moves between
//! them.
//!
//! Host and device personalities are mutually exclusive resources (§5): at
//! any moment at most one of them is installed. The device personality's
//! `DeviceClass::None` is the keyboard-shaped placeholder descriptor that
//! lets `is_attached()` answer "is a downstream computer here at all" before
//! the peer has told us which real class to present — it is installed once
//! at startup and stays up for the whole of the `UNKNOWN`/`DEVICE_*` side of
//! the graph, swapped out only when the peer names a concrete class, or torn
//! down entirely when we cross over to the `HOST_*` side.

use crate::config::{ENUMERATION_SETTLE, USB_SM_POLL};
use crate::error::FatalUsbError;
use crate::logging::info;
use crate::messages::{DeviceClass, Header, Slot, UpdateKind};
use crate::queue::BoundedQueue;
use crate::role::{RoleCell, UsbRole};
use crate::usb_traits::{DevicePersonality, HostPersonality, ReportEvent};
use core::time::Duration;
use embedded_hal::delay::DelayNs;

pub struct UsbStateMachine<'a, Dev, Host, Qout, Qin, D> {
    device: Dev,
    host: Host,
    usb_to_com: Qout,
    com_to_usb: Qin,
    delay: D,
    role: &'a RoleCell,
}

impl<'a, Dev, Host, Qout, Qin, D> UsbStateMachine<'a, Dev, Host, Qout, Qin, D>
where
    Dev: DevicePersonality,
    Host: HostPersonality,
    Qout: BoundedQueue<Slot>,
    Qin: BoundedQueue<Slot>,
    D: DelayNs,
{
    /// `role` is shared with a [`crate::com_sm::ComStateMachine`] on the
    /// other CPU core (§5); this side is the only writer.
    pub fn new(device: Dev, host: Host, usb_to_com: Qout, com_to_usb: Qin, delay: D, role: &'a RoleCell) -> Self {
        UsbStateMachine {
            device,
            host,
            usb_to_com,
            com_to_usb,
            delay,
            role,
        }
    }

    pub fn current_role(&self) -> UsbRole {
        self.role.get()
    }

    /// Bring up the device placeholder and drive role transitions forever.
    /// Board bring-up code pins this to its own core/task per §2.
    pub fn run(&mut self) -> FatalUsbError {
        if let Err(e) = self.device.install(DeviceClass::None) {
            return e;
        }
        self.role.set(UsbRole::Unknown);
        loop {
            if let Err(e) = self.step() {
                return e;
            }
        }
    }

    /// Execute one iteration: dispatch a pending message from the peer if
    /// there is one, otherwise poll local attach/detach state for the
    /// current role. Split out from [`Self::run`] so tests can drive a
    /// bounded number of steps.
    pub fn step(&mut self) -> Result<(), FatalUsbError> {
        let wait = if self.role.get() == UsbRole::Unknown {
            Duration::from_millis(0)
        } else {
            USB_SM_POLL
        };

        if let Some(slot) = self.com_to_usb.recv_timeout(wait) {
            // A STATE message only ever reaches this queue via COM-SM's
            // role-mismatch branch (§4.3 READ/STATE, §4.4 [ADD]); it takes
            // priority over every per-role exit condition and forces both
            // sides back to UNKNOWN regardless of what we were doing.
            if slot.header == Header::State {
                return self.force_unknown();
            }
            return self.dispatch(slot.header, &slot);
        }

        match self.role.get() {
            UsbRole::Unknown => self.poll_unknown(),
            UsbRole::DeviceUnknown => self.poll_device_unknown(),
            UsbRole::DeviceMouse => self.poll_device_side(UsbRole::DeviceMouse),
            UsbRole::DeviceKeyboard => self.poll_device_side(UsbRole::DeviceKeyboard),
            UsbRole::DeviceDatastick => self.poll_device_side(UsbRole::DeviceDatastick),
            UsbRole::HostUnknown => self.poll_host_unknown(),
            UsbRole::HostMouse => self.poll_host_side(UsbRole::HostMouse),
            UsbRole::HostKeyboard => self.poll_host_side(UsbRole::HostKeyboard),
            UsbRole::HostDatastick => self.poll_host_side(UsbRole::HostDatastick),
        }
    }

    fn force_unknown(&mut self) -> Result<(), FatalUsbError> {
        info!("peer STATE received, aborting to UNKNOWN");
        let role = self.role.get();
        if role.is_device_side() {
            self.device.uninstall()?;
            self.device.install(DeviceClass::None)?;
        } else if role.is_host_side() {
            self.host.uninstall()?;
            self.device.install(DeviceClass::None)?;
        }
        self.role.set(UsbRole::Unknown);
        Ok(())
    }

    /// Dispatch a message already known not to be a top-priority `STATE`.
    fn dispatch(&mut self, header: Header, slot: &Slot) -> Result<(), FatalUsbError> {
        match header {
            Header::Update => {
                if let Some(kind) = slot.as_update() {
                    self.dispatch_update(kind)?;
                }
            }
            Header::ReportMouse if self.role.get() == UsbRole::DeviceMouse => {
                if let Some(report) = slot.as_mouse() {
                    self.device.send_mouse_report(report);
                }
            }
            Header::ReportKeyboard if self.role.get() == UsbRole::DeviceKeyboard => {
                if let Some(report) = slot.as_keyboard() {
                    self.device.send_keyboard_report(report);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn dispatch_update(&mut self, kind: UpdateKind) -> Result<(), FatalUsbError> {
        match (self.role.get(), kind) {
            (UsbRole::Unknown, UpdateKind::HostConnected) => {
                // Peer has a host attached to it; we become the host side.
                self.device.uninstall()?;
                self.host.install()?;
                self.role.set(UsbRole::HostUnknown);
                info!("beginning host behaviour");
            }
            (UsbRole::DeviceUnknown, UpdateKind::MouseConnected) => {
                self.swap_device_class(DeviceClass::Mouse, UsbRole::DeviceMouse)?
            }
            (UsbRole::DeviceUnknown, UpdateKind::KeyboardConnected) => {
                self.swap_device_class(DeviceClass::Keyboard, UsbRole::DeviceKeyboard)?
            }
            (UsbRole::DeviceUnknown, UpdateKind::DatastickConnected) => {
                self.swap_device_class(DeviceClass::Datastick, UsbRole::DeviceDatastick)?
            }
            (
                UsbRole::DeviceMouse | UsbRole::DeviceKeyboard | UsbRole::DeviceDatastick,
                UpdateKind::DeviceDisconnected,
            ) => {
                self.device.uninstall()?;
                self.delay.delay_ms(ENUMERATION_SETTLE.as_millis() as u32);
                self.device.install(DeviceClass::None)?;
                self.role.set(UsbRole::DeviceUnknown);
            }
            (
                UsbRole::HostUnknown | UsbRole::HostMouse | UsbRole::HostKeyboard | UsbRole::HostDatastick,
                UpdateKind::HostDisconnected,
            ) => {
                self.host.uninstall()?;
                self.device.install(DeviceClass::None)?;
                self.role.set(UsbRole::Unknown);
            }
            // HOST_CONNECTED/HOST_DISCONNECTED while already device-side, or
            // any update that doesn't apply to the current role, are
            // informational no-ops.
            _ => {}
        }
        Ok(())
    }

    fn swap_device_class(&mut self, class: DeviceClass, role: UsbRole) -> Result<(), FatalUsbError> {
        self.device.uninstall()?;
        self.device.install(class)?;
        self.delay.delay_ms(ENUMERATION_SETTLE.as_millis() as u32);
        self.role.set(role);
        info!("device re-enumerated");
        Ok(())
    }

    /// Neither side has been chosen yet: whichever port shows local evidence
    /// of an attachment first wins. The device placeholder is always
    /// installed here, so `is_attached()` is a cheap poll, not a fresh
    /// enumeration.
    fn poll_unknown(&mut self) -> Result<(), FatalUsbError> {
        if self.device.is_attached() {
            self.usb_to_com.send(Slot::update(UpdateKind::HostConnected));
            self.role.set(UsbRole::DeviceUnknown);
            info!("detected a host, informing the com state machine");
            return Ok(());
        }
        self.delay.delay_ms(10);
        Ok(())
    }

    fn poll_device_unknown(&mut self) -> Result<(), FatalUsbError> {
        if !self.device.is_attached() {
            self.usb_to_com.send(Slot::update(UpdateKind::HostDisconnected));
            self.role.set(UsbRole::Unknown);
            info!("host disconnected");
        }
        Ok(())
    }

    fn poll_device_side(&mut self, role: UsbRole) -> Result<(), FatalUsbError> {
        debug_assert!(role.is_device_side() && role != UsbRole::DeviceUnknown);
        if !self.device.is_attached() {
            self.device.uninstall()?;
            self.delay.delay_ms(ENUMERATION_SETTLE.as_millis() as u32);
            self.usb_to_com.send(Slot::update(UpdateKind::HostDisconnected));
            self.device.install(DeviceClass::None)?;
            self.role.set(UsbRole::Unknown);
            info!("host disconnected");
        }
        Ok(())
    }

    fn poll_host_unknown(&mut self) -> Result<(), FatalUsbError> {
        match self.host.detect_device() {
            DeviceClass::None => {}
            DeviceClass::Mouse => {
                self.role.set(UsbRole::HostMouse);
                self.usb_to_com.send(Slot::update(UpdateKind::MouseConnected));
                info!("mouse detected");
            }
            DeviceClass::Keyboard => {
                self.role.set(UsbRole::HostKeyboard);
                self.usb_to_com.send(Slot::update(UpdateKind::KeyboardConnected));
                info!("keyboard detected");
            }
            DeviceClass::Datastick => {
                self.role.set(UsbRole::HostDatastick);
                self.usb_to_com.send(Slot::update(UpdateKind::DatastickConnected));
                info!("datastick detected");
            }
        }
        Ok(())
    }

    fn poll_host_side(&mut self, role: UsbRole) -> Result<(), FatalUsbError> {
        debug_assert!(role.is_host_side() && role != UsbRole::HostUnknown);
        if self.host.detect_device() == DeviceClass::None {
            self.role.set(UsbRole::HostUnknown);
            self.usb_to_com.send(Slot::update(UpdateKind::DeviceDisconnected));
            info!("peripheral disconnected");
            return Ok(());
        }

        if let Some(event) = self.host.poll_report(USB_SM_POLL) {
            let slot = match event {
                ReportEvent::Mouse(report) => Slot::mouse(report),
                ReportEvent::Keyboard(report) => Slot::keyboard(report),
            };
            self.usb_to_com.try_send(slot);
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::messages::{KeyboardReport, MouseReport};
    use crate::queue::StdQueue;
    use core::time::Duration;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NoopDelay;
    impl DelayNs for NoopDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[derive(Default)]
    struct FakeDevice {
        installed_as: Option<DeviceClass>,
        attached: bool,
        sent_mouse: Vec<MouseReport>,
        sent_keyboard: Vec<KeyboardReport>,
    }

    impl DevicePersonality for Rc<RefCell<FakeDevice>> {
        fn install(&mut self, class: DeviceClass) -> Result<(), FatalUsbError> {
            self.borrow_mut().installed_as = Some(class);
            Ok(())
        }
        fn uninstall(&mut self) -> Result<(), FatalUsbError> {
            self.borrow_mut().installed_as = None;
            Ok(())
        }
        fn is_attached(&mut self) -> bool {
            self.borrow().attached
        }
        fn send_mouse_report(&mut self, report: MouseReport) {
            self.borrow_mut().sent_mouse.push(report);
        }
        fn send_keyboard_report(&mut self, report: KeyboardReport) {
            self.borrow_mut().sent_keyboard.push(report);
        }
    }

    #[derive(Default)]
    struct FakeHost {
        installed: bool,
        class: DeviceClass,
        next_report: Option<ReportEvent>,
    }

    impl HostPersonality for Rc<RefCell<FakeHost>> {
        fn install(&mut self) -> Result<(), FatalUsbError> {
            self.borrow_mut().installed = true;
            Ok(())
        }
        fn uninstall(&mut self) -> Result<(), FatalUsbError> {
            self.borrow_mut().installed = false;
            Ok(())
        }
        fn detect_device(&mut self) -> DeviceClass {
            self.borrow().class
        }
        fn poll_report(&mut self, _timeout: Duration) -> Option<ReportEvent> {
            self.borrow_mut().next_report.take()
        }
    }

    fn machine() -> (
        UsbStateMachine<'static, Rc<RefCell<FakeDevice>>, Rc<RefCell<FakeHost>>, StdQueue<Slot>, StdQueue<Slot>, NoopDelay>,
        Rc<RefCell<FakeDevice>>,
        Rc<RefCell<FakeHost>>,
    ) {
        let device = Rc::new(RefCell::new(FakeDevice::default()));
        let host = Rc::new(RefCell::new(FakeHost::default()));
        let role: &'static RoleCell = Box::leak(Box::new(RoleCell::new(UsbRole::Unknown)));
        let mut sm = UsbStateMachine::new(
            device.clone(),
            host.clone(),
            StdQueue::new(10),
            StdQueue::new(10),
            NoopDelay,
            role,
        );
        device.borrow_mut().installed_as = Some(DeviceClass::None);
        // run() installs the placeholder at startup; tests drive step()
        // directly so set that up by hand instead of calling run().
        let _ = &mut sm;
        (sm, device, host)
    }

    #[test]
    fn unknown_becomes_device_side_when_downstream_computer_attaches() {
        let (mut sm, device, _host) = machine();
        device.borrow_mut().attached = true;
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::DeviceUnknown);
        let update = sm.usb_to_com.recv_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(update.as_update(), Some(UpdateKind::HostConnected));
    }

    #[test]
    fn peer_host_connected_switches_to_host_unknown_and_swaps_personality() {
        let (mut sm, device, host) = machine();
        sm.com_to_usb.send(Slot::update(UpdateKind::HostConnected));
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::HostUnknown);
        assert_eq!(device.borrow().installed_as, None);
        assert!(host.borrow().installed);
    }

    #[test]
    fn host_side_detects_mouse_and_announces_it() {
        let (mut sm, _device, host) = machine();
        sm.com_to_usb.send(Slot::update(UpdateKind::HostConnected));
        sm.step().unwrap(); // UNKNOWN -> HOST_UNKNOWN
        host.borrow_mut().class = DeviceClass::Mouse;
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::HostMouse);
        let update = sm.usb_to_com.recv_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(update.as_update(), Some(UpdateKind::MouseConnected));
    }

    #[test]
    fn host_side_relays_reports_once_role_settled() {
        let (mut sm, _device, host) = machine();
        sm.com_to_usb.send(Slot::update(UpdateKind::HostConnected));
        sm.step().unwrap();
        host.borrow_mut().class = DeviceClass::Mouse;
        sm.step().unwrap();
        let _ = sm.usb_to_com.recv_timeout(Duration::from_millis(10));
        host.borrow_mut().next_report = Some(ReportEvent::Mouse(MouseReport {
            buttons: 1,
            dx: 2,
            dy: -2,
            wheel: 0,
        }));
        sm.step().unwrap();
        let slot = sm.usb_to_com.recv_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(
            slot.as_mouse(),
            Some(MouseReport {
                buttons: 1,
                dx: 2,
                dy: -2,
                wheel: 0
            })
        );
    }

    #[test]
    fn device_side_relays_incoming_mouse_report_only_in_device_mouse_role() {
        let (mut sm, device, _host) = machine();
        device.borrow_mut().attached = true;
        sm.step().unwrap(); // UNKNOWN -> DEVICE_UNKNOWN
        let _ = sm.usb_to_com.recv_timeout(Duration::from_millis(10));

        // Not yet in DEVICE_MOUSE: a stray report is ignored.
        sm.com_to_usb.send(Slot::mouse(MouseReport {
            buttons: 0,
            dx: 1,
            dy: 1,
            wheel: 0,
        }));
        sm.step().unwrap();
        assert_eq!(device.borrow().sent_mouse.len(), 0);

        sm.com_to_usb.send(Slot::update(UpdateKind::MouseConnected));
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::DeviceMouse);

        sm.com_to_usb.send(Slot::mouse(MouseReport {
            buttons: 0,
            dx: 1,
            dy: 1,
            wheel: 0,
        }));
        sm.step().unwrap();
        assert_eq!(device.borrow().sent_mouse.len(), 1);
    }

    #[test]
    fn peer_state_message_resets_to_unknown_and_uninstalls_host() {
        let (mut sm, device, host) = machine();
        sm.com_to_usb.send(Slot::update(UpdateKind::HostConnected));
        sm.step().unwrap();
        host.borrow_mut().class = DeviceClass::Mouse;
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::HostMouse);

        sm.com_to_usb.send(Slot::state(UsbRole::DeviceMouse));
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::Unknown);
        assert!(!host.borrow().installed);
        assert_eq!(device.borrow().installed_as, Some(DeviceClass::None));
    }

    #[test]
    fn device_unknown_switches_role_on_peer_mouse_connected() {
        let (mut sm, device, _host) = machine();
        device.borrow_mut().attached = true;
        sm.step().unwrap(); // UNKNOWN -> DEVICE_UNKNOWN
        let _ = sm.usb_to_com.recv_timeout(Duration::from_millis(10));

        sm.com_to_usb.send(Slot::update(UpdateKind::MouseConnected));
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::DeviceMouse);
        assert_eq!(device.borrow().installed_as, Some(DeviceClass::Mouse));
    }

    #[test]
    fn device_disconnected_falls_back_to_device_unknown_with_placeholder() {
        let (mut sm, device, _host) = machine();
        device.borrow_mut().attached = true;
        sm.step().unwrap();
        let _ = sm.usb_to_com.recv_timeout(Duration::from_millis(10));
        sm.com_to_usb.send(Slot::update(UpdateKind::KeyboardConnected));
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::DeviceKeyboard);

        sm.com_to_usb.send(Slot::update(UpdateKind::DeviceDisconnected));
        sm.step().unwrap();
        assert_eq!(sm.current_role(), UsbRole::DeviceUnknown);
        assert_eq!(device.borrow().installed_as, Some(DeviceClass::None));
    }
}
