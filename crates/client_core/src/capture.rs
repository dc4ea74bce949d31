//! Capture session: one logical camera flow from start to release.

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    device::{
        CaptureFrame, CaptureOwner, DeviceLease, DeviceResourceManager,
        StreamConstraints, VideoStream,
    },
    error::DeviceError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Streaming,
    Captured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub owner: CaptureOwner,
    pub state: CaptureState,
    pub has_frame: bool,
}

struct ActiveStream {
    stream: Box<dyn VideoStream>,
    // dropped after `stream` has been stopped
    _lease: DeviceLease,
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.stream.stop();
    }
}

pub struct CaptureSession {
    owner: CaptureOwner,
    devices: Arc<DeviceResourceManager>,
    constraints: StreamConstraints,
    quality: f32,
    ready_timeout: Duration,
    state: CaptureState,
    active: Option<ActiveStream>,
    frame: Option<CaptureFrame>,
}

impl CaptureSession {
    pub fn new(
        owner: CaptureOwner,
        devices: Arc<DeviceResourceManager>,
        settings: &ClientSettings,
    ) -> Self {
        Self {
            owner,
            devices,
            constraints: StreamConstraints {
                ideal_width: settings.camera_width,
                ideal_height: settings.camera_height,
            },
            quality: settings.jpeg_quality,
            ready_timeout: settings.frame_ready_timeout(),
            state: CaptureState::Idle,
            active: None,
            frame: None,
        }
    }

    pub fn owner(&self) -> CaptureOwner {
        self.owner
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn frame(&self) -> Option<&CaptureFrame> {
        self.frame.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            owner: self.owner,
            state: self.state,
            has_frame: self.frame.is_some(),
        }
    }

    /// Acquires the camera and waits for the first decodable frame.
    ///
    /// Starting an already-streaming session is a no-op. On any failure the
    /// device is released and the session stays Idle.
    pub async fn start(&mut self) -> Result<(), DeviceError> {
        if self.active.is_some() {
            return Ok(());
        }

        let lease = self.devices.acquire(self.owner)?;
        let mut stream = match self.devices.camera().open(self.constraints).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(owner = %self.owner, %err, "camera open failed");
                self.reset_idle();
                return Err(err);
            }
        };

        let ready = match tokio::time::timeout(self.ready_timeout, stream.wait_ready()).await {
            Ok(result) => result,
            Err(_) => Err(DeviceError::NotReady),
        };
        if let Err(err) = ready {
            warn!(owner = %self.owner, %err, "camera never produced a frame");
            stream.stop();
            self.reset_idle();
            return Err(err);
        }

        let dimensions = stream.dimensions();
        self.active = Some(ActiveStream {
            stream,
            _lease: lease,
        });
        self.frame = None;
        self.state = CaptureState::Streaming;
        info!(owner = %self.owner, ?dimensions, "capture streaming");
        Ok(())
    }

    /// Freezes the current frame. Only valid while Streaming.
    pub fn capture(&mut self) -> Result<&CaptureFrame, DeviceError> {
        if self.state != CaptureState::Streaming {
            return Err(DeviceError::NotStreaming);
        }
        let frame = self.grab()?;
        debug!(owner = %self.owner, bytes = frame.bytes.len(), "frame captured");
        self.state = CaptureState::Captured;
        Ok(self.frame.insert(frame))
    }

    /// Snapshots the live stream without leaving Streaming.
    pub fn grab(&mut self) -> Result<CaptureFrame, DeviceError> {
        let quality = self.quality;
        let active = self.active.as_mut().ok_or(DeviceError::NotStreaming)?;
        match active.stream.dimensions() {
            Some((width, height)) if width > 0 && height > 0 => {}
            _ => return Err(DeviceError::NotReady),
        }
        active.stream.snapshot(quality)
    }

    /// Discards the captured frame and resumes the live stream on the same device.
    pub fn retake(&mut self) -> Result<(), DeviceError> {
        self.frame = None;
        if self.active.is_none() {
            self.state = CaptureState::Idle;
            return Err(DeviceError::NotStreaming);
        }
        self.state = CaptureState::Streaming;
        Ok(())
    }

    /// Hands the captured frame to the caller, leaving the stream live.
    pub fn take_frame(&mut self) -> Option<CaptureFrame> {
        let frame = self.frame.take();
        if self.state == CaptureState::Captured {
            self.state = CaptureState::Streaming;
        }
        frame
    }

    /// Releases the device from any state. Idempotent.
    pub fn stop(&mut self) {
        if self.active.is_some() {
            info!(owner = %self.owner, "capture stopped");
        }
        self.reset_idle();
    }

    fn reset_idle(&mut self) {
        self.active = None;
        self.frame = None;
        self.state = CaptureState::Idle;
    }
}

#[cfg(test)]
#[path = "tests/capture_tests.rs"]
mod tests;
