mod capture;

pub use capture::{CaptureLoader, CapturedFrame, FrameSource};

#[cfg(test)]
pub use capture::FrameList;
