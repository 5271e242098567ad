use std::io::{ErrorKind as IoErrorKind, Read, Write};

use embedded_hal::i2c::{Error as _, I2c};

use crate::crc::crc8;
use crate::error::{Error, Result};
use crate::modbus::{self, Request};
use crate::registers::I2C_HOLDING_OFFSET;

/// Register-level access to the module, independent of the bus.
pub trait Transport {
    fn read_input(&mut self, reg: u8) -> Result<u16>;
    fn read_holding(&mut self, reg: u8) -> Result<u16>;
    fn write_holding(&mut self, reg: u8, value: u16) -> Result<()>;
    /// Address future requests to `addr`.
    fn set_address(&mut self, addr: u8);
    fn address(&self) -> u8;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_input(&mut self, reg: u8) -> Result<u16> {
        (**self).read_input(reg)
    }

    fn read_holding(&mut self, reg: u8) -> Result<u16> {
        (**self).read_holding(reg)
    }

    fn write_holding(&mut self, reg: u8, value: u16) -> Result<()> {
        (**self).write_holding(reg, value)
    }

    fn set_address(&mut self, addr: u8) {
        (**self).set_address(addr)
    }

    fn address(&self) -> u8 {
        (**self).address()
    }
}

/// Modbus RTU over any byte stream (a serial port on real hardware).
///
/// The port must already be configured for the module's baud rate and
/// must return `TimedOut`/`WouldBlock` rather than blocking forever.
pub struct UartTransport<P> {
    port: P,
    addr: u8,
}

impl<P: Read + Write> UartTransport<P> {
    pub fn new(port: P, addr: u8) -> Self {
        Self { port, addr }
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    fn exchange(&mut self, request: Request) -> Result<u16> {
        let frame = request.encode(self.addr);
        log::trace!("uart tx {:02x?}", frame);
        self.port.write_all(&frame)?;
        self.port.flush()?;

        let mut buf = [0u8; 8];
        self.read_exact(&mut buf[..2])?;
        let len = if modbus::is_exception(&buf[..2]) {
            modbus::EXCEPTION_LEN
        } else {
            request.response_len()
        };
        self.read_exact(&mut buf[2..len])?;
        log::trace!("uart rx {:02x?}", &buf[..len]);
        request.decode(self.addr, &buf[..len])
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.port.read_exact(buf).map_err(|e| match e.kind() {
            IoErrorKind::TimedOut | IoErrorKind::WouldBlock | IoErrorKind::UnexpectedEof => {
                Error::Timeout
            }
            _ => Error::Io(e),
        })
    }
}

impl<P: Read + Write> Transport for UartTransport<P> {
    fn read_input(&mut self, reg: u8) -> Result<u16> {
        self.exchange(Request::ReadInput { reg: reg as u16 })
    }

    fn read_holding(&mut self, reg: u8) -> Result<u16> {
        self.exchange(Request::ReadHolding { reg: reg as u16 })
    }

    fn write_holding(&mut self, reg: u8, value: u16) -> Result<()> {
        self.exchange(Request::WriteSingle {
            reg: reg as u16,
            value,
        })
        .map(|_| ())
    }

    fn set_address(&mut self, addr: u8) {
        self.addr = addr;
    }

    fn address(&self) -> u8 {
        self.addr
    }
}

const I2C_READ_ATTEMPTS: usize = 3;

/// Register access over I2C with a CRC-8 on every transfer.
pub struct I2cTransport<I> {
    bus: I,
    addr: u8,
}

impl<I: I2c> I2cTransport<I> {
    pub fn new(bus: I, addr: u8) -> Self {
        Self { bus, addr }
    }

    pub fn into_inner(self) -> I {
        self.bus
    }

    fn read_reg(&mut self, reg: u8) -> Result<u16> {
        let mut last = Error::Timeout;
        for attempt in 1..=I2C_READ_ATTEMPTS {
            match self.read_once(reg) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    log::warn!(
                        "i2c read of {:#04x} failed (attempt {}/{}): {}",
                        reg,
                        attempt,
                        I2C_READ_ATTEMPTS,
                        e
                    );
                    last = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    fn read_once(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 3];
        self.bus
            .write(self.addr, &[reg])
            .map_err(|e| Error::I2c(e.kind()))?;
        self.bus
            .read(self.addr, &mut buf)
            .map_err(|e| Error::I2c(e.kind()))?;
        let expected = crc8(&buf[..2]);
        if expected != buf[2] {
            return Err(Error::Crc {
                expected: expected as u16,
                actual: buf[2] as u16,
            });
        }
        Ok(u16::from_be_bytes([buf[0], buf[1]]))
    }

    fn write_reg(&mut self, reg: u8, value: u16) -> Result<()> {
        let [hi, lo] = value.to_be_bytes();
        let frame = [reg, hi, lo, crc8(&[reg, hi, lo])];
        log::trace!("i2c tx {:02x?}", frame);
        self.bus
            .write(self.addr, &frame)
            .map_err(|e| Error::I2c(e.kind()))?;

        let actual = self.read_reg(reg)?;
        if actual != value {
            return Err(Error::WriteMismatch {
                reg,
                expected: value,
                actual,
            });
        }
        Ok(())
    }
}

impl<I: I2c> Transport for I2cTransport<I> {
    fn read_input(&mut self, reg: u8) -> Result<u16> {
        self.read_reg(reg)
    }

    fn read_holding(&mut self, reg: u8) -> Result<u16> {
        self.read_reg(I2C_HOLDING_OFFSET + reg)
    }

    fn write_holding(&mut self, reg: u8, value: u16) -> Result<()> {
        self.write_reg(I2C_HOLDING_OFFSET + reg, value)
    }

    fn set_address(&mut self, addr: u8) {
        self.addr = addr;
    }

    fn address(&self) -> u8 {
        self.addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Serial port stub: records what was written, replays canned bytes.
    struct ScriptedPort {
        written: Vec<u8>,
        reply: VecDeque<u8>,
    }

    impl ScriptedPort {
        fn new(reply: &[u8]) -> Self {
            Self {
                written: Vec::new(),
                reply: reply.iter().copied().collect(),
            }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.reply.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
            }
            let n = buf.len().min(self.reply.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.reply.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crate::crc::crc16_modbus(body).to_le_bytes());
        frame
    }

    #[test]
    fn test_uart_read_input() {
        let port = ScriptedPort::new(&with_crc(&[0x72, 0x04, 0x02, 0x02, 0x72]));
        let mut uart = UartTransport::new(port, 0x72);
        assert_eq!(uart.read_input(0x00).unwrap(), 0x0272);
        let port = uart.into_inner();
        assert_eq!(port.written, Request::ReadInput { reg: 0 }.encode(0x72));
    }

    #[test]
    fn test_uart_exception_is_read_whole() {
        let port = ScriptedPort::new(&with_crc(&[0x72, 0x86, 0x03]));
        let mut uart = UartTransport::new(port, 0x72);
        let err = uart.write_holding(0x05, 200).unwrap_err();
        assert!(matches!(err, Error::Exception { function: 0x06, code: 0x03 }));
        assert!(uart.into_inner().reply.is_empty());
    }

    #[test]
    fn test_uart_silence_is_timeout() {
        let mut uart = UartTransport::new(ScriptedPort::new(&[]), 0x72);
        assert!(matches!(uart.read_input(0x04), Err(Error::Timeout)));
    }

    #[test]
    fn test_uart_follows_new_address() {
        let port = ScriptedPort::new(&with_crc(&[0x10, 0x04, 0x02, 0x00, 0x01]));
        let mut uart = UartTransport::new(port, 0x72);
        uart.set_address(0x10);
        assert_eq!(uart.read_input(0x04).unwrap(), 1);
        assert_eq!(uart.into_inner().written[0], 0x10);
    }
}
