//! Minimal driver console
//!
//! Talks to a robot at 127.0.0.1 (run the `ds-robot` example in another
//! terminal), enables teleop once it is safe to do so, and logs every state
//! change.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use setu_link::{DsClient, JoystickData, LinkConfig};

fn main() -> setu_link::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = LinkConfig::protocol_defaults();
    config.addresses.custom_robot = Some("127.0.0.1".to_string());

    let mut client = DsClient::new(config);
    client.set_team_number(1234);
    client.start()?;
    client.update_joysticks(vec![JoystickData {
        axes: vec![0.0, 0.0],
        buttons: vec![false; 10],
        hats: vec![-1],
    }]);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::Relaxed))
        .map_err(|e| setu_link::Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    log::info!("Console running; press Ctrl-C to stop");

    let events = client.events();
    let mut enabled = false;
    while running.load(Ordering::Relaxed) {
        while let Ok(event) = events.try_recv() {
            log::info!("Event: {:?}", event);
        }
        if !enabled && client.can_be_enabled() {
            log::info!("Robot is up ({}), enabling", client.status_string());
            client.set_robot_enabled(true);
            enabled = true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    client.stop();
    Ok(())
}
