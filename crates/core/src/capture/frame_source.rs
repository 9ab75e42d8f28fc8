use crate::capture::domain::camera_device::{CameraDevice, DeviceError, MediaStream};
use crate::shared::constants::{DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH};
use crate::shared::frame::Frame;

/// Live camera feed bound to a display surface.
///
/// Holding a stream means holding the camera: `stop()` (or drop) releases
/// it by stopping every track individually before unbinding.
pub struct FrameSource {
    device: Box<dyn CameraDevice>,
    stream: Option<Box<dyn MediaStream>>,
    display_width: u32,
    display_height: u32,
}

impl FrameSource {
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        Self::with_display_size(device, DEFAULT_DISPLAY_WIDTH, DEFAULT_DISPLAY_HEIGHT)
    }

    pub fn with_display_size(device: Box<dyn CameraDevice>, width: u32, height: u32) -> Self {
        Self {
            device,
            stream: None,
            display_width: width,
            display_height: height,
        }
    }

    /// Acquires the camera. Already-bound sources are left as they are.
    ///
    /// On failure nothing is bound.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = self.device.open_stream().map_err(|e| {
            log::error!("Error starting video feed: {e}");
            e
        })?;
        log::info!("Video feed started ({} tracks)", stream.tracks().len());
        self.stream = Some(stream);
        Ok(())
    }

    pub fn stop(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        for track in stream.tracks_mut() {
            track.stop();
        }
        log::info!("Video feed stopped");
    }

    pub fn is_bound(&self) -> bool {
        self.stream.is_some()
    }

    pub fn current_frame(&mut self) -> Option<Frame> {
        self.stream.as_mut().and_then(|s| s.current_frame())
    }

    /// Number of tracks still holding the device.
    pub fn active_track_count(&self) -> usize {
        self.stream
            .as_ref()
            .map_or(0, |s| s.tracks().iter().filter(|t| t.is_live()).count())
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }

    pub fn set_display_size(&mut self, width: u32, height: u32) {
        self.display_width = width;
        self.display_height = height;
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}
