use thiserror::Error;

use crate::shared::frame::Frame;

/// Why the capture device could not be acquired.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device found")]
    NotFound,

    #[error("camera error: {0}")]
    Other(String),
}

/// A single hardware track (video, or audio on combined devices).
///
/// The device stays locked (and its indicator lit) until every track of a
/// stream has been stopped.
pub trait MediaTrack: Send {
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}

/// An open capture stream.
pub trait MediaStream: Send {
    fn tracks(&self) -> &[Box<dyn MediaTrack>];

    fn tracks_mut(&mut self) -> &mut [Box<dyn MediaTrack>];

    /// The most recent decodable frame, or `None` before the first frame
    /// has arrived.
    fn current_frame(&mut self) -> Option<Frame>;
}

/// Platform camera access, in the style of `getUserMedia({ video: {} })`.
///
/// Backends implement this for a concrete device API; the session core only
/// ever holds one stream at a time.
pub trait CameraDevice: Send {
    fn open_stream(&mut self) -> Result<Box<dyn MediaStream>, DeviceError>;
}
