use facecount_sensor::{Detection, Gesture};

/// Something that changed between two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Faces { count: u16, score: u16 },
    Gesture { gesture: Option<Gesture>, score: u16 },
}

impl Event {
    /// Human-readable status line for logs.
    pub fn status(&self) -> String {
        match *self {
            Event::Faces { count: 0, .. } => "No face detected".to_string(),
            Event::Faces { count, score } => format!(
                "Detected {} face{} with a confidence of {} %",
                count,
                if count == 1 { "" } else { "s" },
                score
            ),
            Event::Gesture { gesture: None, .. } => "No gesture detected".to_string(),
            Event::Gesture {
                gesture: Some(gesture),
                score,
            } => format!(
                "Detected a {} gesture with a confidence of {} %",
                gesture, score
            ),
        }
    }
}

/// Turns a stream of polls into change events.
#[derive(Debug, Default)]
pub struct Monitor {
    last_faces: u16,
    last_gesture: Option<Gesture>,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor that treats `faces`/`gesture` as the previous poll.
    pub fn resume(faces: u16, gesture: Option<Gesture>) -> Self {
        Self {
            last_faces: faces,
            last_gesture: gesture,
        }
    }

    pub fn observe(&mut self, detection: &Detection) -> Vec<Event> {
        let mut events = Vec::new();
        if detection.faces != self.last_faces {
            self.last_faces = detection.faces;
            events.push(Event::Faces {
                count: detection.faces,
                score: detection.face_score,
            });
        }
        if detection.gesture != self.last_gesture {
            self.last_gesture = detection.gesture;
            events.push(Event::Gesture {
                gesture: detection.gesture,
                score: detection.gesture_score,
            });
        }
        events
    }

    pub fn last_faces(&self) -> u16 {
        self.last_faces
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
