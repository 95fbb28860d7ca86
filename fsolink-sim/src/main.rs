//! Runnable demonstration and manual integration harness for two
//! `fsolink-core` endpoints talking over an in-process duplex pipe (§2,
//! §10.4), standing in for `fsolink-core/tests/scenarios.rs`'s automated
//! coverage of the same scenarios.
//!
//! Each endpoint pins its `ComStateMachine` and `UsbStateMachine` to their
//! own OS thread, sharing one `RoleCell` per endpoint the way a board's two
//! CPU cores would (§5).

mod delay;
mod mock_usb;
mod pipe;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use fsolink_core::config::QUEUE_DEPTH;
use fsolink_core::messages::{DeviceClass, Slot};
use fsolink_core::queue::StdQueue;
use fsolink_core::role::{RoleCell, UsbRole};
use fsolink_core::{ComStateMachine, UsbStateMachine};

use delay::SystemDelay;
use mock_usb::{MockDevice, MockHost};
use pipe::duplex;

#[derive(Parser)]
#[command(name = "fsolink-sim")]
#[command(about = "Wire two fsolink-core endpoints together over an in-process pipe")]
struct Cli {
    /// How long to run the simulation before tearing everything down.
    #[arg(long, default_value_t = 15)]
    duration_secs: u64,

    /// Seed for the BACKOFF jitter RNGs, so runs are reproducible.
    #[arg(long, default_value_t = 0x5EED_C0DE)]
    seed: u64,

    /// After the link has settled, write a single raw carrier byte onto the
    /// A->B wire and fall silent, reproducing scenario S6.
    #[arg(long)]
    inject_error: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let role_a = RoleCell::new(UsbRole::Unknown);
    let role_b = RoleCell::new(UsbRole::Unknown);

    let usb_to_com_a: Arc<StdQueue<Slot>> = Arc::new(StdQueue::new(QUEUE_DEPTH));
    let com_to_usb_a: Arc<StdQueue<Slot>> = Arc::new(StdQueue::new(QUEUE_DEPTH));
    let usb_to_com_b: Arc<StdQueue<Slot>> = Arc::new(StdQueue::new(QUEUE_DEPTH));
    let com_to_usb_b: Arc<StdQueue<Slot>> = Arc::new(StdQueue::new(QUEUE_DEPTH));

    let (pipe_a, pipe_b) = duplex();
    let inject_a_to_b = pipe_a.injector();

    let device_a = MockDevice::new("A");
    let host_a = MockHost::new("A");
    let device_b = MockDevice::new("B");
    let host_b = MockHost::new("B");

    log::info!(
        "starting fsolink-sim: duration={}s seed={:#x} inject_error={}",
        cli.duration_secs,
        cli.seed,
        cli.inject_error
    );

    // `move` closures below each need their own independently-owned handles:
    // `RoleCell` is shared by reference (references are `Copy`, so the same
    // `&RoleCell` can be moved into several closures), while the `Arc`
    // queues and mock personalities are shared by cloning before the move.
    let role_a_ref: &RoleCell = &role_a;
    let role_b_ref: &RoleCell = &role_b;

    let seed_a = cli.seed;
    let seed_b = cli.seed.wrapping_add(1);
    let duration_secs = cli.duration_secs;
    let inject_error = cli.inject_error;

    let com_queues_a = (usb_to_com_a.clone(), com_to_usb_a.clone());
    let com_queues_b = (usb_to_com_b.clone(), com_to_usb_b.clone());
    let usb_queues_a = (usb_to_com_a.clone(), com_to_usb_a.clone());
    let usb_queues_b = (usb_to_com_b.clone(), com_to_usb_b.clone());

    let usb_device_a = device_a.clone();
    let usb_host_a = host_a.clone();
    let usb_device_b = device_b.clone();
    let usb_host_b = host_b.clone();
    let director_device_a = device_a;
    let director_host_b = host_b;

    thread::scope(|scope| {
        // COM-SM, one thread per endpoint (§2).
        scope.spawn(move || {
            let rng = StdRng::seed_from_u64(seed_a);
            let (usb_to_com, com_to_usb) = com_queues_a;
            let mut com = ComStateMachine::new(pipe_a, usb_to_com, com_to_usb, SystemDelay, rng, role_a_ref);
            com.run();
        });
        scope.spawn(move || {
            let rng = StdRng::seed_from_u64(seed_b);
            let (usb_to_com, com_to_usb) = com_queues_b;
            let mut com = ComStateMachine::new(pipe_b, usb_to_com, com_to_usb, SystemDelay, rng, role_b_ref);
            com.run();
        });

        // USB-SM, one thread per endpoint (§2).
        scope.spawn(move || {
            let (usb_to_com, com_to_usb) = usb_queues_a;
            let mut usb = UsbStateMachine::new(usb_device_a, usb_host_a, usb_to_com, com_to_usb, SystemDelay, role_a_ref);
            let err = usb.run();
            log::error!("[A] usb state machine aborted: {}", err);
        });
        scope.spawn(move || {
            let (usb_to_com, com_to_usb) = usb_queues_b;
            let mut usb = UsbStateMachine::new(usb_device_b, usb_host_b, usb_to_com, com_to_usb, SystemDelay, role_b_ref);
            let err = usb.run();
            log::error!("[B] usb state machine aborted: {}", err);
        });

        // Scenario director: A gets a downstream computer plugged in (S3),
        // B's peripheral turns out to be a mouse (S4), and we watch it run.
        scope.spawn(move || {
            thread::sleep(Duration::from_secs(1));
            log::info!("director: plugging a downstream computer into A");
            director_device_a.set_attached(true);

            thread::sleep(Duration::from_secs(2));
            log::info!("director: plugging a mouse into B");
            director_host_b.set_class(DeviceClass::Mouse);

            if inject_error {
                thread::sleep(Duration::from_secs(2));
                log::info!("director: injecting a lone carrier byte onto A->B (S6)");
                inject_a_to_b.inject(&[0xAA]);
            }

            thread::sleep(Duration::from_secs(duration_secs));
            log::info!(
                "director: winding down (roles: A={:?} B={:?})",
                role_a_ref.get(),
                role_b_ref.get()
            );
            std::process::exit(0);
        });
    });

    Ok(())
}
