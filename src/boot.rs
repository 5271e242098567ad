use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use crate::sensor::Sensor;

/// Start-up handshake timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootPolicy {
    pub warmup: Duration,
    pub retry_interval: Duration,
    /// `None` keeps retrying until the module answers.
    pub max_attempts: Option<u32>,
}

/// Wait for the module to boot, then probe it until it answers.
pub fn wait_for_device<S, F>(sensor: &mut S, policy: &BootPolicy, mut sleep: F) -> Result<()>
where
    S: Sensor + ?Sized,
    F: FnMut(Duration),
{
    // The module needs a few seconds after power-up before it responds
    sleep(policy.warmup);

    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match sensor.begin() {
            Ok(true) => {
                info!("Communication with device established");
                return Ok(());
            }
            Ok(false) => warn!("Communication with device failed, please check connection"),
            Err(e) => warn!(
                "Communication with device failed, please check connection ({})",
                e
            ),
        }
        if let Some(max) = policy.max_attempts {
            if attempts >= max {
                anyhow::bail!("device did not respond after {} attempts", attempts);
            }
        }
        sleep(policy.retry_interval);
    }
}
