pub mod crc;
pub mod device;
pub mod error;
pub mod gesture;
pub mod modbus;
pub mod registers;
pub mod transport;

// Re-export commonly used types
pub use device::GestureFaceSensor;
pub use error::{Error, Result};
pub use gesture::{Detection, Gesture};
pub use registers::{BaudRate, Parity, StopBits};
pub use transport::{I2cTransport, Transport, UartTransport};
