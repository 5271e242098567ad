//! Modbus RTU framing used by the module's UART interface.

use crate::crc::crc16_modbus;
use crate::error::{Error, Result};

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const READ_INPUT_REGISTERS: u8 = 0x04;
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;

const EXCEPTION_FLAG: u8 = 0x80;
/// addr + func + code + crc
pub const EXCEPTION_LEN: usize = 5;

/// A single-register request the driver knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ReadInput { reg: u16 },
    ReadHolding { reg: u16 },
    WriteSingle { reg: u16, value: u16 },
}

impl Request {
    pub fn function(&self) -> u8 {
        match self {
            Request::ReadInput { .. } => READ_INPUT_REGISTERS,
            Request::ReadHolding { .. } => READ_HOLDING_REGISTERS,
            Request::WriteSingle { .. } => WRITE_SINGLE_REGISTER,
        }
    }

    /// Encode into a complete RTU frame including the CRC.
    pub fn encode(&self, addr: u8) -> [u8; 8] {
        let (reg, word) = match *self {
            Request::ReadInput { reg } | Request::ReadHolding { reg } => (reg, 1),
            Request::WriteSingle { reg, value } => (reg, value),
        };
        let mut frame = [0u8; 8];
        frame[0] = addr;
        frame[1] = self.function();
        frame[2..4].copy_from_slice(&reg.to_be_bytes());
        frame[4..6].copy_from_slice(&word.to_be_bytes());
        let crc = crc16_modbus(&frame[..6]);
        frame[6..8].copy_from_slice(&crc.to_le_bytes());
        frame
    }

    /// Length of a successful response frame.
    pub fn response_len(&self) -> usize {
        match self {
            // addr + func + count + 2 data + crc
            Request::ReadInput { .. } | Request::ReadHolding { .. } => 7,
            // echo of the request
            Request::WriteSingle { .. } => 8,
        }
    }

    /// Validate a response frame and extract the register value.
    ///
    /// For writes the echoed value is returned.
    pub fn decode(&self, addr: u8, frame: &[u8]) -> Result<u16> {
        check_crc(frame)?;
        if frame[0] != addr {
            return Err(Error::Frame("response from another slave"));
        }
        let function = self.function();
        if frame[1] == function | EXCEPTION_FLAG {
            if frame.len() != EXCEPTION_LEN {
                return Err(Error::Frame("exception frame has wrong length"));
            }
            return Err(Error::Exception {
                function,
                code: frame[2],
            });
        }
        if frame[1] != function {
            return Err(Error::Frame("function code mismatch"));
        }
        if frame.len() != self.response_len() {
            return Err(Error::Frame("unexpected response length"));
        }
        match *self {
            Request::ReadInput { .. } | Request::ReadHolding { .. } => {
                if frame[2] != 2 {
                    return Err(Error::Frame("unexpected byte count"));
                }
                Ok(u16::from_be_bytes([frame[3], frame[4]]))
            }
            Request::WriteSingle { .. } => {
                if frame[..6] != self.encode(addr)[..6] {
                    return Err(Error::Frame("write echo does not match request"));
                }
                Ok(u16::from_be_bytes([frame[4], frame[5]]))
            }
        }
    }
}

/// True when the first two bytes of a response announce an exception.
pub fn is_exception(head: &[u8]) -> bool {
    head.len() >= 2 && head[1] & EXCEPTION_FLAG != 0
}

fn check_crc(frame: &[u8]) -> Result<()> {
    if frame.len() < 4 {
        return Err(Error::Frame("frame too short"));
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    let expected = crc16_modbus(body);
    let actual = u16::from_le_bytes([tail[0], tail[1]]);
    if expected != actual {
        return Err(Error::Crc { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc16_modbus(body).to_le_bytes());
        frame
    }

    #[test]
    fn test_encode_read_input() {
        let frame = Request::ReadInput { reg: 0 }.encode(0x72);
        assert_eq!(frame, [0x72, 0x04, 0x00, 0x00, 0x00, 0x01, 0x3A, 0xC9]);
    }

    #[test]
    fn test_encode_write_single() {
        let frame = Request::WriteSingle { reg: 5, value: 60 }.encode(0x72);
        assert_eq!(frame, [0x72, 0x06, 0x00, 0x05, 0x00, 0x3C, 0x92, 0xD9]);
    }

    #[test]
    fn test_decode_read_response() {
        let req = Request::ReadHolding { reg: 4 };
        let frame = with_crc(&[0x72, 0x03, 0x02, 0x00, 0x64]);
        assert_eq!(req.decode(0x72, &frame).unwrap(), 100);
    }

    #[test]
    fn test_decode_exception() {
        let req = Request::ReadInput { reg: 0x40 };
        let frame = with_crc(&[0x72, 0x84, 0x02]);
        assert!(is_exception(&frame[..2]));
        match req.decode(0x72, &frame) {
            Err(Error::Exception { function, code }) => {
                assert_eq!(function, 0x04);
                assert_eq!(code, 0x02);
            }
            other => panic!("expected exception, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bad_crc() {
        let req = Request::ReadInput { reg: 4 };
        let mut frame = with_crc(&[0x72, 0x04, 0x02, 0x00, 0x03]);
        frame[4] ^= 0xFF;
        assert!(matches!(req.decode(0x72, &frame), Err(Error::Crc { .. })));
    }

    #[test]
    fn test_decode_rejects_foreign_slave() {
        let req = Request::ReadInput { reg: 4 };
        let frame = with_crc(&[0x10, 0x04, 0x02, 0x00, 0x03]);
        assert!(matches!(req.decode(0x72, &frame), Err(Error::Frame(_))));
    }

    #[test]
    fn test_decode_write_echo() {
        let req = Request::WriteSingle { reg: 6, value: 75 };
        let echo = req.encode(0x72);
        assert_eq!(req.decode(0x72, &echo).unwrap(), 75);

        let other = Request::WriteSingle { reg: 6, value: 76 }.encode(0x72);
        assert!(matches!(req.decode(0x72, &other), Err(Error::Frame(_))));
    }
}
