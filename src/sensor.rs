use std::time::Duration;

use anyhow::{Context, Result};
use facecount_sensor::{Detection, GestureFaceSensor, I2cTransport, Transport, UartTransport};
use linux_embedded_hal::I2cdev;
use log::info;

use crate::config::{self, Config};

/// A presence sensor the counter can poll.
pub trait Sensor {
    fn sensor_type(&self) -> &'static str;

    /// Probe the hardware; false means it is not answering yet.
    fn begin(&mut self) -> Result<bool>;

    fn poll(&mut self) -> Result<Detection>;
}

impl<T: Transport> Sensor for GestureFaceSensor<T> {
    fn sensor_type(&self) -> &'static str {
        "GestureFace"
    }

    fn begin(&mut self) -> Result<bool> {
        Ok(GestureFaceSensor::begin(self)?)
    }

    fn poll(&mut self) -> Result<Detection> {
        self.read_detection().context("polling gesture/face module")
    }
}

pub type DynSensor = GestureFaceSensor<Box<dyn Transport>>;

/// Open the bus described by the config and wrap it in a driver.
pub fn open(cfg: &Config) -> Result<DynSensor> {
    let transport: Box<dyn Transport> = match &cfg.transport {
        config::Transport::I2c { bus, address } => {
            info!("Opening I2C bus {} (address {:#04x})", bus, address);
            let dev = I2cdev::new(bus).with_context(|| format!("opening I2C bus {}", bus))?;
            Box::new(I2cTransport::new(dev, *address))
        }
        config::Transport::Uart {
            port,
            baud,
            address,
        } => {
            info!(
                "Opening serial port {} at {} baud (address {:#04x})",
                port, baud, address
            );
            let serial = serialport::new(port.as_str(), *baud)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .timeout(Duration::from_millis(cfg.response_timeout_ms))
                .open()
                .with_context(|| format!("opening serial port {}", port))?;
            Box::new(UartTransport::new(serial, *address))
        }
    };
    Ok(GestureFaceSensor::new(transport))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted sensor: fails `begin` a set number of times, then replays
    /// detections (or errors) in order. Empty script reads as "nothing seen".
    pub struct FakeSensor {
        pub begin_failures: u32,
        pub begin_calls: u32,
        pub script: VecDeque<Result<Detection>>,
        pub polls: usize,
    }

    impl FakeSensor {
        pub fn new(detections: Vec<Detection>) -> Self {
            Self {
                begin_failures: 0,
                begin_calls: 0,
                script: detections.into_iter().map(Ok).collect(),
                polls: 0,
            }
        }
    }

    impl Sensor for FakeSensor {
        fn sensor_type(&self) -> &'static str {
            "Fake"
        }

        fn begin(&mut self) -> Result<bool> {
            self.begin_calls += 1;
            if self.begin_failures > 0 {
                self.begin_failures -= 1;
                return Ok(false);
            }
            Ok(true)
        }

        fn poll(&mut self) -> Result<Detection> {
            self.polls += 1;
            self.script.pop_front().unwrap_or_else(|| Ok(Detection::default()))
        }
    }
}
