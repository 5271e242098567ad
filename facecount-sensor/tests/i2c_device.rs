/// Drives the driver over a simulated I2C register bank.
use std::collections::HashMap;

use anyhow::Result;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use facecount_sensor::crc::crc8;
use facecount_sensor::registers::*;
use facecount_sensor::{Error, GestureFaceSensor, I2cTransport, Transport};

struct SimulatedBus {
    addr: u8,
    regs: HashMap<u8, u16>,
    pointer: u8,
    /// Number of upcoming reads whose CRC byte gets flipped.
    corrupt_reads: usize,
    /// Writes are ignored, as if the module were write protected.
    read_only: bool,
}

impl SimulatedBus {
    fn new() -> Self {
        let mut regs = HashMap::new();
        regs.insert(REG_PID, PRODUCT_ID);
        regs.insert(REG_VID, 0x3343);
        regs.insert(REG_FACE_NUMBER, 1);
        regs.insert(REG_FACE_SCORE, 70);
        regs.insert(REG_GESTURE_TYPE, 1);
        regs.insert(REG_GESTURE_SCORE, 80);
        regs.insert(I2C_HOLDING_OFFSET + REG_DETECT_RANGE, 100);
        Self {
            addr: DEFAULT_ADDRESS,
            regs,
            pointer: 0,
            corrupt_reads: 0,
            read_only: false,
        }
    }
}

impl ErrorType for SimulatedBus {
    type Error = ErrorKind;
}

impl I2c for SimulatedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.addr {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => match bytes.len() {
                    1 => self.pointer = bytes[0],
                    4 => {
                        if crc8(&bytes[..3]) != bytes[3] {
                            return Err(ErrorKind::Other);
                        }
                        self.pointer = bytes[0];
                        if !self.read_only {
                            self.regs
                                .insert(bytes[0], u16::from_be_bytes([bytes[1], bytes[2]]));
                        }
                    }
                    _ => return Err(ErrorKind::Other),
                },
                Operation::Read(buf) => {
                    let value = self.regs.get(&self.pointer).copied().unwrap_or(0);
                    let [hi, lo] = value.to_be_bytes();
                    let mut crc = crc8(&[hi, lo]);
                    if self.corrupt_reads > 0 {
                        self.corrupt_reads -= 1;
                        crc ^= 0xFF;
                    }
                    for (slot, byte) in buf.iter_mut().zip([hi, lo, crc]) {
                        *slot = byte;
                    }
                }
            }
        }
        Ok(())
    }
}

#[test]
fn test_i2c_begin_and_detection() -> Result<()> {
    let mut gfd = GestureFaceSensor::new(I2cTransport::new(SimulatedBus::new(), DEFAULT_ADDRESS));
    assert!(gfd.begin()?);
    let detection = gfd.read_detection()?;
    assert_eq!(detection.faces, 1);
    assert_eq!(detection.face_score, 70);
    assert_eq!(detection.gesture.map(|g| g.name()), Some("LIKE"));
    Ok(())
}

#[test]
fn test_i2c_holding_registers_are_offset() -> Result<()> {
    let mut gfd = GestureFaceSensor::new(I2cTransport::new(SimulatedBus::new(), DEFAULT_ADDRESS));
    assert_eq!(gfd.get_detect_thres()?, 100);
    assert!(gfd.set_face_detect_thres(55)?);
    let bus = gfd.into_inner().into_inner();
    assert_eq!(bus.regs[&(I2C_HOLDING_OFFSET + REG_FACE_SCORE_THRESHOLD)], 55);
    Ok(())
}

#[test]
fn test_i2c_retries_corrupted_reads() -> Result<()> {
    let mut bus = SimulatedBus::new();
    bus.corrupt_reads = 2;
    let mut transport = I2cTransport::new(bus, DEFAULT_ADDRESS);
    assert_eq!(transport.read_input(REG_PID)?, PRODUCT_ID);
    Ok(())
}

#[test]
fn test_i2c_gives_up_after_three_bad_reads() {
    let mut bus = SimulatedBus::new();
    bus.corrupt_reads = 3;
    let mut transport = I2cTransport::new(bus, DEFAULT_ADDRESS);
    assert!(matches!(transport.read_input(REG_PID), Err(Error::Crc { .. })));
}

#[test]
fn test_i2c_write_is_verified() {
    let mut bus = SimulatedBus::new();
    bus.read_only = true;
    let mut gfd = GestureFaceSensor::new(I2cTransport::new(bus, DEFAULT_ADDRESS));
    match gfd.set_detect_thres(40) {
        Err(Error::WriteMismatch { expected, actual, .. }) => {
            assert_eq!(expected, 40);
            assert_eq!(actual, 100);
        }
        other => panic!("expected write mismatch, got {:?}", other),
    }
}

#[test]
fn test_i2c_absent_device() {
    let mut gfd = GestureFaceSensor::new(I2cTransport::new(SimulatedBus::new(), 0x30));
    assert!(matches!(gfd.begin(), Err(Error::I2c(ErrorKind::NoAcknowledge(_)))));
}
