use crate::error::{Error, Result};
use crate::gesture::{Detection, Gesture};
use crate::registers::*;
use crate::transport::Transport;

/// Driver for the combined face/gesture detection module.
///
/// Every call is a blocking register exchange; nothing is cached.
pub struct GestureFaceSensor<T> {
    transport: T,
}

impl<T: Transport> GestureFaceSensor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Probe the module. True once it answers with the expected product ID.
    pub fn begin(&mut self) -> Result<bool> {
        let pid = self.read_pid()?;
        if pid != PRODUCT_ID {
            log::debug!("unexpected PID {:#06x}", pid);
        }
        Ok(pid == PRODUCT_ID)
    }

    pub fn read_pid(&mut self) -> Result<u16> {
        self.transport.read_input(REG_PID)
    }

    pub fn read_vid(&mut self) -> Result<u16> {
        self.transport.read_input(REG_VID)
    }

    pub fn hardware_version(&mut self) -> Result<u16> {
        self.transport.read_input(REG_HW_VERSION)
    }

    pub fn software_version(&mut self) -> Result<u16> {
        self.transport.read_input(REG_SW_VERSION)
    }

    /// Minimum face score (0-100) for a face to be reported.
    pub fn set_face_detect_thres(&mut self, score: u16) -> Result<bool> {
        self.write_threshold("face detection threshold", REG_FACE_SCORE_THRESHOLD, score)
    }

    pub fn get_face_detect_thres(&mut self) -> Result<u16> {
        self.transport.read_holding(REG_FACE_SCORE_THRESHOLD)
    }

    /// Minimum gesture score (0-100) for a gesture to be reported.
    pub fn set_gesture_detect_thres(&mut self, score: u16) -> Result<bool> {
        self.write_threshold(
            "gesture detection threshold",
            REG_GESTURE_SCORE_THRESHOLD,
            score,
        )
    }

    pub fn get_gesture_detect_thres(&mut self) -> Result<u16> {
        self.transport.read_holding(REG_GESTURE_SCORE_THRESHOLD)
    }

    /// Detection range, 0-100 (100 is the farthest).
    pub fn set_detect_thres(&mut self, range: u16) -> Result<bool> {
        self.write_threshold("detection range", REG_DETECT_RANGE, range)
    }

    pub fn get_detect_thres(&mut self) -> Result<u16> {
        self.transport.read_holding(REG_DETECT_RANGE)
    }

    fn write_threshold(&mut self, name: &'static str, reg: u8, value: u16) -> Result<bool> {
        if value > MAX_THRESHOLD {
            return Err(Error::out_of_range(name, value as u32, 0, MAX_THRESHOLD as u32));
        }
        self.transport.write_holding(reg, value)?;
        Ok(true)
    }

    /// Change the module's serial settings. They apply after it restarts.
    pub fn config_uart(&mut self, baud: BaudRate, parity: Parity, stop_bits: StopBits) -> Result<()> {
        self.transport.write_holding(REG_BAUDRATE, baud.code())?;
        self.transport.write_holding(REG_PARITY, parity.code())?;
        self.transport.write_holding(REG_STOP_BITS, stop_bits.code())?;
        log::debug!(
            "uart settings written: {} baud, {:?} parity, {:?} stop bits",
            baud.bits_per_second(),
            parity,
            stop_bits
        );
        Ok(())
    }

    /// Give the module a new bus address and keep talking to it there.
    pub fn set_addr(&mut self, addr: u8) -> Result<bool> {
        if addr == 0 || addr > MAX_ADDRESS {
            return Err(Error::out_of_range("device address", addr as u32, 1, MAX_ADDRESS as u32));
        }
        self.transport.write_holding(REG_ADDR, addr as u16)?;
        self.transport.set_address(addr);
        Ok(true)
    }

    pub fn get_face_number(&mut self) -> Result<u16> {
        self.transport.read_input(REG_FACE_NUMBER)
    }

    pub fn get_face_score(&mut self) -> Result<u16> {
        self.transport.read_input(REG_FACE_SCORE)
    }

    pub fn get_face_location_x(&mut self) -> Result<u16> {
        self.transport.read_input(REG_FACE_LOCATION_X)
    }

    pub fn get_face_location_y(&mut self) -> Result<u16> {
        self.transport.read_input(REG_FACE_LOCATION_Y)
    }

    /// Raw gesture code: 0 for none, 1-5 for a recognised gesture.
    pub fn get_gesture_type(&mut self) -> Result<u16> {
        self.transport.read_input(REG_GESTURE_TYPE)
    }

    pub fn get_gesture_score(&mut self) -> Result<u16> {
        self.transport.read_input(REG_GESTURE_SCORE)
    }

    pub fn gesture(&mut self) -> Result<Option<Gesture>> {
        let code = self.get_gesture_type()?;
        decode_gesture(code)
    }

    /// Poll the module once.
    ///
    /// Only the face count is read when no face is in view.
    pub fn read_detection(&mut self) -> Result<Detection> {
        let faces = self.get_face_number()?;
        if faces == 0 {
            return Ok(Detection::default());
        }
        let face_score = self.get_face_score()?;
        let face_x = self.get_face_location_x()?;
        let face_y = self.get_face_location_y()?;
        let gesture = self.gesture()?;
        let gesture_score = self.get_gesture_score()?;
        Ok(Detection {
            faces,
            face_score,
            face_x,
            face_y,
            gesture,
            gesture_score,
        })
    }
}

fn decode_gesture(code: u16) -> Result<Option<Gesture>> {
    match code {
        0 => Ok(None),
        code => Gesture::from_code(code)
            .map(Some)
            .ok_or(Error::UnknownGesture(code)),
    }
}
