pub mod admin;
pub mod app;
pub mod backend;
pub mod capture;
pub mod config;
pub mod device;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod mark_gate;
pub mod navigation;
pub mod records;
pub mod sync;
pub mod training;

pub use admin::{AdminSession, ConfirmationPrompt, MaintenanceOp};
pub use app::{AppCommand, AttendanceApp};
pub use backend::{AttendanceBackend, HttpBackend};
pub use capture::{CaptureSession, CaptureState};
pub use config::{load_settings, ClientSettings};
pub use device::{CameraDevice, CaptureFrame, CaptureOwner, DeviceResourceManager, VideoStream};
pub use error::{ClientError, ClientResult};
pub use events::{AppEvent, Notice, NoticeLevel};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
