use std::fmt;

/// Hand gestures the module recognises, with their register codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Gesture {
    Like = 1,
    Ok = 2,
    Stop = 3,
    Yes = 4,
    Six = 5,
}

impl Gesture {
    pub const ALL: [Gesture; 5] = [
        Gesture::Like,
        Gesture::Ok,
        Gesture::Stop,
        Gesture::Yes,
        Gesture::Six,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Map a register code to a gesture. Zero and unknown codes give `None`.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Gesture::Like => "LIKE",
            Gesture::Ok => "OK",
            Gesture::Stop => "STOP",
            Gesture::Yes => "YES",
            Gesture::Six => "SIX",
        }
    }

    /// Colour of the module's LED while the gesture is shown.
    pub fn color(self) -> &'static str {
        match self {
            Gesture::Like => "blue",
            Gesture::Ok => "green",
            Gesture::Stop => "red",
            Gesture::Yes => "yellow",
            Gesture::Six => "purple",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One poll of the module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Detection {
    pub faces: u16,
    pub face_score: u16,
    pub face_x: u16,
    pub face_y: u16,
    pub gesture: Option<Gesture>,
    pub gesture_score: u16,
}

impl Detection {
    pub fn has_face(&self) -> bool {
        self.faces > 0
    }
}
