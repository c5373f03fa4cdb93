pub mod controller;
pub mod frame;
pub mod loop_worker;
pub mod source;

pub use controller::{CameraBackend, CameraManager, CameraStatus, StartOutcome, StopOutcome};
pub use frame::Frame;
pub use source::{DeviceOpener, FrameSource, OpenError};
