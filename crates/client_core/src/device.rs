//! Camera capability and the exclusive device lease.
//!
//! The camera is a singleton resource. Every capture flow goes through
//! [`DeviceResourceManager::acquire`], which hands out at most one
//! [`DeviceLease`] at a time; dropping the lease frees the device.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

use crate::error::DeviceError;

pub const JPEG_MIME: &str = "image/jpeg";

/// Logical capture flow that may hold the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureOwner {
    Enrollment,
    Attendance,
    Training,
}

impl fmt::Display for CaptureOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptureOwner::Enrollment => "enrollment",
            CaptureOwner::Attendance => "attendance",
            CaptureOwner::Training => "training",
        })
    }
}

/// Preferred resolution for the user-facing camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
        }
    }
}

/// Encoded still image taken from a live stream.
#[derive(Clone, PartialEq)]
pub struct CaptureFrame {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub quality: f32,
    pub width: u32,
    pub height: u32,
}

impl CaptureFrame {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

impl fmt::Debug for CaptureFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureFrame")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("quality", &self.quality)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// An open video stream from the camera driver.
#[async_trait]
pub trait VideoStream: Send {
    /// Resolves once the first decodable frame is available.
    async fn wait_ready(&mut self) -> Result<(), DeviceError>;
    /// Native pixel dimensions of the stream, if a frame has been decoded.
    fn dimensions(&self) -> Option<(u32, u32)>;
    /// Encodes the current frame as a compressed still at `quality` in (0, 1].
    fn snapshot(&mut self, quality: f32) -> Result<CaptureFrame, DeviceError>;
    /// Stops every track. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Acquire side of the camera driver.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceError>;
}

pub struct MissingCameraDevice;

#[async_trait]
impl CameraDevice for MissingCameraDevice {
    async fn open(
        &self,
        _constraints: StreamConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceError> {
        Err(DeviceError::Unavailable("no camera driver configured".into()))
    }
}

pub struct DeviceResourceManager {
    camera: Arc<dyn CameraDevice>,
    holder: Mutex<Option<CaptureOwner>>,
}

impl DeviceResourceManager {
    pub fn new(camera: Arc<dyn CameraDevice>) -> Arc<Self> {
        Arc::new(Self {
            camera,
            holder: Mutex::new(None),
        })
    }

    pub fn holder(&self) -> Option<CaptureOwner> {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves the camera for `owner`. Fails with [`DeviceError::Busy`] while another
    /// lease is alive, including one held by the same owner.
    pub fn acquire(self: &Arc<Self>, owner: CaptureOwner) -> Result<DeviceLease, DeviceError> {
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = *holder {
            debug!(%owner, holder = %current, "camera acquisition refused");
            return Err(DeviceError::Busy { holder: current });
        }
        *holder = Some(owner);
        info!(%owner, "camera acquired");
        Ok(DeviceLease {
            manager: Arc::clone(self),
            owner,
        })
    }

    pub(crate) fn camera(&self) -> &Arc<dyn CameraDevice> {
        &self.camera
    }

    fn release(&self, owner: CaptureOwner) {
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        if *holder == Some(owner) {
            *holder = None;
            info!(%owner, "camera released");
        }
    }
}

/// Proof of exclusive camera ownership; releases the device on drop.
pub struct DeviceLease {
    manager: Arc<DeviceResourceManager>,
    owner: CaptureOwner,
}

impl DeviceLease {
    pub fn owner(&self) -> CaptureOwner {
        self.owner
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.manager.release(self.owner);
    }
}

impl fmt::Debug for DeviceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLease")
            .field("owner", &self.owner)
            .finish()
    }
}
