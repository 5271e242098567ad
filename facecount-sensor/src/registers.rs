//! Register map of the gesture/face module.
//!
//! The same register numbers are used over UART (Modbus function codes pick
//! the bank) and I2C (the holding bank is shifted by [`I2C_HOLDING_OFFSET`]).

use crate::error::{Error, Result};

/// Value of the PID input register on a genuine module.
pub const PRODUCT_ID: u16 = 0x0272;
/// Factory slave address on both buses.
pub const DEFAULT_ADDRESS: u8 = 0x72;
/// Highest address a Modbus slave may take.
pub const MAX_ADDRESS: u8 = 0xF7;
/// Upper bound of every score/range threshold.
pub const MAX_THRESHOLD: u16 = 100;

/// I2C register index of holding register 0.
pub const I2C_HOLDING_OFFSET: u8 = 0x50;

// Holding registers
pub const REG_ADDR: u8 = 0x00;
pub const REG_BAUDRATE: u8 = 0x01;
pub const REG_PARITY: u8 = 0x02;
pub const REG_STOP_BITS: u8 = 0x03;
pub const REG_DETECT_RANGE: u8 = 0x04;
pub const REG_FACE_SCORE_THRESHOLD: u8 = 0x05;
pub const REG_GESTURE_SCORE_THRESHOLD: u8 = 0x06;

// Input registers
pub const REG_PID: u8 = 0x00;
pub const REG_VID: u8 = 0x01;
pub const REG_HW_VERSION: u8 = 0x02;
pub const REG_SW_VERSION: u8 = 0x03;
pub const REG_FACE_NUMBER: u8 = 0x04;
pub const REG_FACE_LOCATION_X: u8 = 0x05;
pub const REG_FACE_LOCATION_Y: u8 = 0x06;
pub const REG_FACE_SCORE: u8 = 0x07;
pub const REG_GESTURE_TYPE: u8 = 0x08;
pub const REG_GESTURE_SCORE: u8 = 0x09;

/// Serial speeds the module can be switched to, with their register codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BaudRate {
    B1200 = 1,
    B2400 = 2,
    B4800 = 3,
    B9600 = 4,
    B14400 = 5,
    B19200 = 6,
    B38400 = 7,
    B57600 = 8,
    B115200 = 9,
    B230400 = 10,
    B460800 = 11,
    B921600 = 12,
}

impl BaudRate {
    const ALL: [BaudRate; 12] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B14400,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B230400,
        BaudRate::B460800,
        BaudRate::B921600,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B14400 => 14400,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
            BaudRate::B230400 => 230400,
            BaudRate::B460800 => 460800,
            BaudRate::B921600 => 921600,
        }
    }

    pub fn from_bits_per_second(bps: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.bits_per_second() == bps)
            .ok_or_else(|| Error::out_of_range("baud rate", bps, 1200, 921600))
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Parity {
    None = 0,
    Odd = 1,
    Even = 2,
    Mark = 3,
    Space = 4,
}

impl Parity {
    pub fn code(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StopBits {
    Half = 0,
    One = 1,
    OneAndHalf = 2,
    Two = 3,
}

impl StopBits {
    pub fn code(self) -> u16 {
        self as u16
    }
}
