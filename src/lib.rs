pub mod boot;
pub mod config;
pub mod counter;
pub mod monitor;
pub mod report;
pub mod sensor;
pub mod storage;

// Re-export driver types for convenience
pub use facecount_sensor::{Detection, Gesture, GestureFaceSensor};
pub use sensor::Sensor;
