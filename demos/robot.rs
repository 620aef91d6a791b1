//! Minimal robot-side endpoint
//!
//! Listens for a driver console, reports a healthy controller (code running,
//! nominal battery), and logs the commands the console sends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use setu_link::{DsRobot, LinkConfig};

fn main() -> setu_link::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut robot = DsRobot::new(LinkConfig::protocol_defaults());
    robot.set_robot_code(true);
    robot.set_robot_voltage(12.4);
    robot.start()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::Relaxed))
        .map_err(|e| setu_link::Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    log::info!("Robot endpoint running; press Ctrl-C to stop");

    let events = robot.events();
    while running.load(Ordering::Relaxed) {
        while let Ok(event) = events.try_recv() {
            log::info!("Event: {:?}", event);
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    robot.stop();
    Ok(())
}
