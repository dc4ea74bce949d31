//! In-process fakes for the camera driver, backend and confirmation prompt.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    domain::SubjectId,
    protocol::{
        AdminLoginRequest, AdminLoginResponse, AttendanceRow, AttendanceStats,
        MaintenanceResponse, MarkRequest, MarkResponse, RecordsResponse, RegisterResponse,
        RegisterStudentRequest, Student, TrainingUploadRequest,
    },
};

use crate::{
    admin::{AdminToken, ConfirmationPrompt, MaintenanceOp},
    backend::AttendanceBackend,
    config::ClientSettings,
    device::{CameraDevice, CaptureFrame, StreamConstraints, VideoStream, JPEG_MIME},
    error::{ClientResult, DeviceError, NetworkError},
};

pub fn test_settings() -> ClientSettings {
    ClientSettings {
        frame_ready_timeout_ms: 50,
        ..ClientSettings::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Ready,
    PermissionDenied,
    NeverReady,
}

pub struct FakeCamera {
    mode: CameraMode,
    opens: AtomicUsize,
    stops: Arc<AtomicUsize>,
    snapshots: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn new(mode: CameraMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            opens: AtomicUsize::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
            snapshots: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn ready() -> Arc<Self> {
        Self::new(CameraMode::Ready)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for FakeCamera {
    async fn open(
        &self,
        _constraints: StreamConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            CameraMode::PermissionDenied => Err(DeviceError::PermissionDenied),
            mode => Ok(Box::new(FakeStream {
                ready: mode == CameraMode::Ready,
                stopped: false,
                stops: Arc::clone(&self.stops),
                snapshots: Arc::clone(&self.snapshots),
            })),
        }
    }
}

struct FakeStream {
    ready: bool,
    stopped: bool,
    stops: Arc<AtomicUsize>,
    snapshots: Arc<AtomicUsize>,
}

#[async_trait]
impl VideoStream for FakeStream {
    async fn wait_ready(&mut self) -> Result<(), DeviceError> {
        if !self.ready {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        (self.ready && !self.stopped).then_some((640, 480))
    }

    fn snapshot(&mut self, quality: f32) -> Result<CaptureFrame, DeviceError> {
        let n = self.snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(CaptureFrame {
            bytes: format!("frame-{n}").into_bytes(),
            mime_type: JPEG_MIME.into(),
            quality,
            width: 640,
            height: 480,
        })
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().expect("fake backend lock")
}

pub fn transport_error() -> NetworkError {
    NetworkError::Transport("connection refused".into())
}

/// Scriptable backend that records every call.
pub struct FakeBackend {
    pub students: Mutex<Vec<Student>>,
    pub rows: Mutex<Vec<AttendanceRow>>,
    pub stats: Mutex<AttendanceStats>,
    pub fail_sync: AtomicBool,
    pub mark_result: Mutex<ClientResult<MarkResponse>>,
    pub register_result: Mutex<ClientResult<RegisterResponse>>,
    pub upload_results: Mutex<VecDeque<ClientResult<RegisterResponse>>>,
    pub login_result: Mutex<ClientResult<AdminLoginResponse>>,
    pub maintenance_result: Mutex<ClientResult<MaintenanceResponse>>,
    pub sync_calls: AtomicUsize,
    pub record_dates: Mutex<Vec<Option<NaiveDate>>>,
    pub marks: Mutex<Vec<MarkRequest>>,
    pub registrations: Mutex<Vec<RegisterStudentRequest>>,
    pub uploads: Mutex<Vec<TrainingUploadRequest>>,
    pub logins: Mutex<Vec<AdminLoginRequest>>,
    pub maintenance_calls: Mutex<Vec<(MaintenanceOp, String)>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            students: Mutex::new(vec![Student {
                roll_no: SubjectId::new("S1"),
                name: "Ada Lovelace".into(),
            }]),
            rows: Mutex::new(Vec::new()),
            stats: Mutex::new(AttendanceStats::default()),
            fail_sync: AtomicBool::new(false),
            mark_result: Mutex::new(Ok(MarkResponse {
                status: "Present".into(),
                student_id: Some("S1".into()),
                confidence: Some(0.91),
            })),
            register_result: Mutex::new(Ok(RegisterResponse {
                ok: true,
                msg: "Registered".into(),
                saved: 1,
            })),
            upload_results: Mutex::new(VecDeque::new()),
            login_result: Mutex::new(Ok(AdminLoginResponse {
                ok: true,
                token: Some("admin_token_123".into()),
                message: None,
            })),
            maintenance_result: Mutex::new(Ok(MaintenanceResponse {
                ok: true,
                message: Some("done".into()),
            })),
            sync_calls: AtomicUsize::new(0),
            record_dates: Mutex::new(Vec::new()),
            marks: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            logins: Mutex::new(Vec::new()),
            maintenance_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn queue_upload(&self, result: ClientResult<RegisterResponse>) {
        lock(&self.upload_results).push_back(result);
    }

    fn sync_guard(&self) -> ClientResult<()> {
        if self.fail_sync.load(Ordering::SeqCst) {
            return Err(transport_error().into());
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceBackend for FakeBackend {
    async fn list_students(&self) -> ClientResult<Vec<Student>> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        self.sync_guard()?;
        Ok(lock(&self.students).clone())
    }

    async fn list_records(&self, date: Option<NaiveDate>) -> ClientResult<RecordsResponse> {
        lock(&self.record_dates).push(date);
        self.sync_guard()?;
        Ok(RecordsResponse {
            rows: lock(&self.rows).clone(),
            date: date.map(|day| day.to_string()),
        })
    }

    async fn stats(&self) -> ClientResult<AttendanceStats> {
        self.sync_guard()?;
        Ok(lock(&self.stats).clone())
    }

    async fn register_student(
        &self,
        request: RegisterStudentRequest,
    ) -> ClientResult<RegisterResponse> {
        lock(&self.registrations).push(request);
        lock(&self.register_result).clone()
    }

    async fn mark(&self, request: MarkRequest) -> ClientResult<MarkResponse> {
        lock(&self.marks).push(request);
        lock(&self.mark_result).clone()
    }

    async fn upload_training_set(
        &self,
        request: TrainingUploadRequest,
    ) -> ClientResult<RegisterResponse> {
        let saved = request.photos_base64.len() as u32;
        lock(&self.uploads).push(request);
        lock(&self.upload_results).pop_front().unwrap_or(Ok(RegisterResponse {
            ok: true,
            msg: "Saved".into(),
            saved,
        }))
    }

    async fn login(&self, request: AdminLoginRequest) -> ClientResult<AdminLoginResponse> {
        lock(&self.logins).push(request);
        lock(&self.login_result).clone()
    }

    async fn maintenance(
        &self,
        op: MaintenanceOp,
        token: &AdminToken,
    ) -> ClientResult<MaintenanceResponse> {
        lock(&self.maintenance_calls).push((op, token.expose_secret().to_string()));
        lock(&self.maintenance_result).clone()
    }
}

/// Answers every confirmation with a fixed choice and remembers the questions.
pub struct FixedPrompt {
    answer: bool,
    pub asked: Mutex<Vec<String>>,
}

impl FixedPrompt {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ConfirmationPrompt for FixedPrompt {
    async fn confirm(&self, message: &str) -> bool {
        lock(&self.asked).push(message.to_string());
        self.answer
    }
}
