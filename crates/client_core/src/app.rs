//! Application aggregate: owns every workflow component and turns user
//! intents into transitions.
//!
//! The presentation layer pushes [`AppCommand`]s through [`AttendanceApp::dispatch`]
//! and renders whatever arrives on [`AttendanceApp::subscribe_events`]. Failures
//! never escape `dispatch`; each one becomes a [`Notice`].

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use shared::{
    domain::{AttendanceOutcome, PageId, SubjectId},
    protocol::{MarkRequest, MarkResponse, TRAINING_QUOTA},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    admin::{AdminSession, ConfirmationPrompt, MaintenanceOp, MaintenanceOutcome},
    backend::{AttendanceBackend, HttpBackend},
    capture::CaptureSession,
    config::ClientSettings,
    device::{CameraDevice, CaptureFrame, CaptureOwner, DeviceResourceManager},
    enrollment::EnrollmentForm,
    error::{ClientResult, NetworkError, ValidationError},
    events::{AppEvent, Notice},
    mark_gate::{mark_notice, AttendanceMarkGate},
    navigation::{NavigationController, PageEntered},
    records::{export_csv, RecordFilter, RecordsView},
    sync::{DataSnapshot, DataSync},
    training::{TrainingPipeline, TrainingState, TrainingStep},
};

const EVENT_CAPACITY: usize = 1024;
pub const SYNC_FAILURE_MESSAGE: &str = "Failed to load data from server";

/// Every user intent the presentation layer can express.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Navigate(PageId),
    NavigateNamed(String),
    Back,
    Refresh,
    SetRecordFilter(RecordFilter),
    StartCamera,
    CapturePhoto,
    RetakePhoto,
    StopCamera,
    SelectSubject(Option<SubjectId>),
    SelectOutcome(Option<AttendanceOutcome>),
    SubmitMark,
    ResetMarkForm,
    OpenEnrollmentCamera,
    CaptureEnrollmentPhoto,
    RetakeEnrollmentPhoto,
    SubmitEnrollment(EnrollmentForm),
    StartTraining(SubjectId),
    TrainingCapture,
    StopTraining,
    RetryTrainingUpload,
    AdminLogin { email: String, password: String },
    AdminLogout,
    Maintenance(MaintenanceOp),
}

impl AppCommand {
    /// Message used when a command fails below the HTTP layer.
    fn failure_fallback(&self) -> &'static str {
        match self {
            AppCommand::SubmitMark => "Mark failed",
            AppCommand::SubmitEnrollment(_) => "Registration failed",
            AppCommand::TrainingCapture | AppCommand::RetryTrainingUpload => {
                "Training upload failed"
            }
            AppCommand::AdminLogin { .. } => "Login failed. Please try again.",
            AppCommand::Maintenance(op) => op.error_message(),
            _ => SYNC_FAILURE_MESSAGE,
        }
    }
}

pub struct AttendanceApp {
    settings: ClientSettings,
    backend: Arc<dyn AttendanceBackend>,
    devices: Arc<DeviceResourceManager>,
    prompt: Arc<dyn ConfirmationPrompt>,
    navigation: NavigationController,
    attendance: CaptureSession,
    enrollment: CaptureSession,
    enrollment_photo: Option<CaptureFrame>,
    gate: AttendanceMarkGate,
    training: TrainingPipeline,
    admin: AdminSession,
    sync: DataSync,
    record_filter: RecordFilter,
    events: broadcast::Sender<AppEvent>,
}

impl AttendanceApp {
    pub fn new(
        settings: ClientSettings,
        backend: Arc<dyn AttendanceBackend>,
        camera: Arc<dyn CameraDevice>,
        prompt: Arc<dyn ConfirmationPrompt>,
    ) -> Self {
        let devices = DeviceResourceManager::new(camera);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let session =
            |owner| CaptureSession::new(owner, Arc::clone(&devices), &settings);

        Self {
            attendance: session(CaptureOwner::Attendance),
            enrollment: session(CaptureOwner::Enrollment),
            training: TrainingPipeline::new(
                session(CaptureOwner::Training),
                Arc::clone(&backend),
            ),
            admin: AdminSession::new(Arc::clone(&backend)),
            sync: DataSync::new(Arc::clone(&backend)),
            navigation: NavigationController::new(),
            enrollment_photo: None,
            gate: AttendanceMarkGate::new(),
            record_filter: RecordFilter::default(),
            settings,
            backend,
            devices,
            prompt,
            events,
        }
    }

    /// Builds the app against the HTTP backend described by `settings`.
    pub fn connect(
        settings: ClientSettings,
        camera: Arc<dyn CameraDevice>,
        prompt: Arc<dyn ConfirmationPrompt>,
    ) -> ClientResult<Self> {
        let backend = Arc::new(HttpBackend::new(settings.clone())?);
        Ok(Self::new(settings, backend, camera, prompt))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn devices(&self) -> &Arc<DeviceResourceManager> {
        &self.devices
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    pub fn mark_gate(&self) -> &AttendanceMarkGate {
        &self.gate
    }

    pub fn attendance_session(&self) -> &CaptureSession {
        &self.attendance
    }

    pub fn enrollment_session(&self) -> &CaptureSession {
        &self.enrollment
    }

    pub fn enrollment_photo(&self) -> Option<&CaptureFrame> {
        self.enrollment_photo.as_ref()
    }

    pub fn training(&self) -> &TrainingPipeline {
        &self.training
    }

    pub fn admin(&self) -> &AdminSession {
        &self.admin
    }

    pub fn data(&self) -> Arc<DataSnapshot> {
        self.sync.snapshot()
    }

    pub fn record_filter(&self) -> &RecordFilter {
        &self.record_filter
    }

    /// Runs one command. Returns the failure notice, if the command failed; it
    /// has already been published.
    pub async fn dispatch(&mut self, command: AppCommand) -> Option<Notice> {
        debug!(?command, "dispatch");
        let fallback = command.failure_fallback();
        let result = match command {
            AppCommand::Navigate(page) => {
                self.navigate(page);
                Ok(())
            }
            AppCommand::NavigateNamed(name) => self.navigate_named(&name),
            AppCommand::Back => {
                self.back();
                Ok(())
            }
            AppCommand::Refresh => {
                self.resync().await;
                Ok(())
            }
            AppCommand::SetRecordFilter(filter) => {
                self.set_record_filter(filter);
                Ok(())
            }
            AppCommand::StartCamera => self.start_camera().await,
            AppCommand::CapturePhoto => self.capture_photo(),
            AppCommand::RetakePhoto => self.retake_photo(),
            AppCommand::StopCamera => {
                self.stop_camera();
                Ok(())
            }
            AppCommand::SelectSubject(subject) => {
                self.select_subject(subject);
                Ok(())
            }
            AppCommand::SelectOutcome(outcome) => {
                self.select_outcome(outcome);
                Ok(())
            }
            AppCommand::SubmitMark => self.submit_mark().await.map(|_| ()),
            AppCommand::ResetMarkForm => {
                self.reset_mark_form();
                Ok(())
            }
            AppCommand::OpenEnrollmentCamera => self.open_enrollment_camera().await,
            AppCommand::CaptureEnrollmentPhoto => self.capture_enrollment_photo(),
            AppCommand::RetakeEnrollmentPhoto => self.retake_enrollment_photo().await,
            AppCommand::SubmitEnrollment(form) => self.submit_enrollment(form).await,
            AppCommand::StartTraining(subject) => self.start_training(subject).await,
            AppCommand::TrainingCapture => self.training_capture().await,
            AppCommand::StopTraining => {
                self.stop_training();
                Ok(())
            }
            AppCommand::RetryTrainingUpload => self.retry_training_upload().await,
            AppCommand::AdminLogin { email, password } => {
                self.admin_login(&email, &password).await
            }
            AppCommand::AdminLogout => {
                self.admin_logout();
                Ok(())
            }
            AppCommand::Maintenance(op) => self.run_maintenance(op).await.map(|_| ()),
        };

        match result {
            Ok(()) => None,
            Err(err) => {
                let notice = Notice::from_error(&err, fallback);
                warn!(%err, "command failed");
                self.notify(notice.clone());
                Some(notice)
            }
        }
    }

    pub fn navigate(&mut self, page: PageId) {
        let entered = self.navigation.navigate_to(page);
        self.page_entered(entered);
    }

    pub fn navigate_named(&mut self, name: &str) -> ClientResult<()> {
        match self.navigation.navigate_to_named(name) {
            Some(entered) => {
                self.page_entered(entered);
                Ok(())
            }
            None => Err(ValidationError::UnknownPage(name.to_string()).into()),
        }
    }

    pub fn back(&mut self) {
        if let Some(entered) = self.navigation.navigate_back() {
            self.page_entered(entered);
        }
    }

    fn page_entered(&mut self, entered: PageEntered) {
        if entered.previous != entered.page {
            self.page_exited(entered.previous);
        }
        self.publish(AppEvent::PageChanged(self.navigation.snapshot()));
        if entered.refresh_derived {
            self.publish(AppEvent::RecordsView(self.records_view()));
        }
    }

    /// A frame that was not submitted does not outlive its page, and neither does
    /// the camera that produced it.
    fn page_exited(&mut self, page: PageId) {
        match page {
            PageId::Mark => self.reset_mark_form(),
            PageId::Register => {
                self.enrollment_photo = None;
                self.enrollment.stop();
                self.publish(AppEvent::CaptureChanged(self.enrollment.snapshot()));
            }
            _ => {}
        }
    }

    pub fn records_view(&self) -> RecordsView {
        let data = self.sync.snapshot();
        RecordsView::build(
            &data.records,
            &data.lookup,
            &self.record_filter,
            Utc::now().date_naive(),
        )
    }

    pub fn set_record_filter(&mut self, filter: RecordFilter) {
        self.record_filter = filter;
        self.publish(AppEvent::RecordsView(self.records_view()));
    }

    /// CSV of the rows the current filter shows.
    pub fn export_records(&self) -> String {
        let view = self.records_view();
        info!(rows = view.lines.len(), "exporting records");
        export_csv(&view.lines)
    }

    /// Day the next refresh asks records for; `None` leaves it to the server.
    pub fn set_records_date(&mut self, date: Option<NaiveDate>) {
        self.sync.set_records_date(date);
    }

    pub async fn refresh(&mut self) -> ClientResult<Arc<DataSnapshot>> {
        let snapshot = self.sync.refresh().await?;
        self.publish(AppEvent::DataRefreshed(Arc::clone(&snapshot)));
        if self.navigation.current().shows_derived_data() {
            self.publish(AppEvent::RecordsView(self.records_view()));
        }
        Ok(snapshot)
    }

    /// Refresh whose failure is reported as a notice and otherwise ignored.
    async fn resync(&mut self) {
        if self.refresh().await.is_err() {
            self.notify(Notice::error(SYNC_FAILURE_MESSAGE));
        }
    }

    pub async fn start_camera(&mut self) -> ClientResult<()> {
        let result = self.attendance.start().await;
        self.publish(AppEvent::CaptureChanged(self.attendance.snapshot()));
        result?;
        self.notify(Notice::success("Camera started successfully!"));
        Ok(())
    }

    pub fn capture_photo(&mut self) -> ClientResult<()> {
        let frame = self.attendance.capture()?.clone();
        self.gate.set_frame(Some(frame));
        self.publish(AppEvent::CaptureChanged(self.attendance.snapshot()));
        self.publish(AppEvent::MarkGateChanged(self.gate.snapshot()));
        self.notify(Notice::success("Photo captured successfully!"));
        Ok(())
    }

    pub fn retake_photo(&mut self) -> ClientResult<()> {
        self.gate.set_frame(None);
        let result = self.attendance.retake();
        self.publish(AppEvent::CaptureChanged(self.attendance.snapshot()));
        self.publish(AppEvent::MarkGateChanged(self.gate.snapshot()));
        Ok(result?)
    }

    pub fn stop_camera(&mut self) {
        self.attendance.stop();
        self.publish(AppEvent::CaptureChanged(self.attendance.snapshot()));
    }

    pub fn select_subject(&mut self, subject: Option<SubjectId>) -> bool {
        let enabled = self.gate.select_subject(subject);
        self.publish(AppEvent::MarkGateChanged(self.gate.snapshot()));
        enabled
    }

    pub fn select_outcome(&mut self, outcome: Option<AttendanceOutcome>) -> bool {
        let enabled = self.gate.select_outcome(outcome);
        self.publish(AppEvent::MarkGateChanged(self.gate.snapshot()));
        enabled
    }

    /// Sends the gated selection to the recognizer. The form is reset after the
    /// attempt whatever its result.
    pub async fn submit_mark(&mut self) -> ClientResult<MarkResponse> {
        let submission = self.gate.take_submission()?;
        info!(
            subject = %submission.subject,
            outcome = %submission.outcome,
            "submitting attendance mark"
        );
        let result = self
            .backend
            .mark(MarkRequest {
                photo_base64: submission.frame.to_data_url(),
            })
            .await;
        self.reset_mark_form();

        let response = result?;
        self.notify(mark_notice(&response));
        self.resync().await;
        self.navigate(PageId::Check);
        Ok(response)
    }

    pub fn reset_mark_form(&mut self) {
        self.gate.clear();
        self.attendance.stop();
        self.publish(AppEvent::CaptureChanged(self.attendance.snapshot()));
        self.publish(AppEvent::MarkGateChanged(self.gate.snapshot()));
    }

    pub async fn open_enrollment_camera(&mut self) -> ClientResult<()> {
        let result = self.enrollment.start().await;
        self.publish(AppEvent::CaptureChanged(self.enrollment.snapshot()));
        Ok(result?)
    }

    /// Freezes a photo for the enrollment form and closes the camera.
    pub fn capture_enrollment_photo(&mut self) -> ClientResult<()> {
        self.enrollment.capture()?;
        self.enrollment_photo = self.enrollment.take_frame();
        self.enrollment.stop();
        self.publish(AppEvent::CaptureChanged(self.enrollment.snapshot()));
        self.notify(Notice::success("Photo captured successfully!"));
        Ok(())
    }

    pub async fn retake_enrollment_photo(&mut self) -> ClientResult<()> {
        self.enrollment_photo = None;
        self.open_enrollment_camera().await
    }

    pub async fn submit_enrollment(&mut self, form: EnrollmentForm) -> ClientResult<()> {
        let request = form.to_request(self.enrollment_photo.as_ref())?;
        let id = request.id.clone();
        let response = self.backend.register_student(request).await?;
        if !response.ok {
            let message = if response.msg.is_empty() {
                "Registration failed".to_string()
            } else {
                response.msg
            };
            return Err(NetworkError::Rejected(message).into());
        }

        info!(%id, saved = response.saved, "student enrolled");
        self.notify(Notice::success("Student registered successfully!"));
        self.resync().await;
        self.enrollment_photo = None;
        self.enrollment.stop();
        self.navigate(PageId::Mark);
        Ok(())
    }

    pub async fn start_training(&mut self, subject: SubjectId) -> ClientResult<()> {
        let was_capturing = self.training.state() == TrainingState::Capturing;
        let result = self.training.start(subject).await;
        self.publish(AppEvent::TrainingProgress(self.training.progress()));
        result?;
        if was_capturing {
            return Ok(());
        }
        self.notify(Notice::success(format!(
            "Training camera started! Click 'Manual Capture' {TRAINING_QUOTA} times."
        )));
        Ok(())
    }

    pub async fn training_capture(&mut self) -> ClientResult<()> {
        let was_capturing = self.training.state() == TrainingState::Capturing;
        let result = self.training.manual_capture().await;
        let progress = self.training.progress();
        if !matches!(result, Ok(TrainingStep::Ignored)) {
            self.publish(AppEvent::TrainingProgress(progress.clone()));
        }
        if was_capturing && progress.state == TrainingState::Completed {
            self.notify(Notice::success(format!(
                "Training completed! {TRAINING_QUOTA} images captured."
            )));
        }

        match result? {
            TrainingStep::Ignored => {}
            TrainingStep::Captured(progress) => self.notify(Notice::success(format!(
                "Captured {}/{} images",
                progress.captured, progress.quota
            ))),
            TrainingStep::Uploaded { .. } => self.notify(Notice::success(format!(
                "Uploaded {TRAINING_QUOTA} images and retrained model."
            ))),
        }
        Ok(())
    }

    pub fn stop_training(&mut self) {
        if self.training.stop() {
            self.publish(AppEvent::TrainingProgress(self.training.progress()));
            self.notify(Notice::info("Training stopped."));
        }
    }

    pub async fn retry_training_upload(&mut self) -> ClientResult<()> {
        let result = self.training.retry_upload().await;
        self.publish(AppEvent::TrainingProgress(self.training.progress()));
        if let TrainingStep::Uploaded { .. } = result? {
            self.notify(Notice::success(format!(
                "Uploaded {TRAINING_QUOTA} images and retrained model."
            )));
        }
        Ok(())
    }

    pub async fn admin_login(&mut self, email: &str, password: &str) -> ClientResult<()> {
        let result = self.admin.login(email, password).await;
        self.publish(AppEvent::AdminChanged(self.admin.snapshot()));
        result?;
        self.notify(Notice::success("Admin login successful!"));
        Ok(())
    }

    pub fn admin_logout(&mut self) {
        self.admin.logout();
        self.publish(AppEvent::AdminChanged(self.admin.snapshot()));
        self.notify(Notice::info("Logged out successfully"));
    }

    pub async fn run_maintenance(&mut self, op: MaintenanceOp) -> ClientResult<MaintenanceOutcome> {
        let outcome = self.admin.run(op, self.prompt.as_ref()).await?;
        if outcome == MaintenanceOutcome::Completed {
            self.notify(Notice::success(op.success_message()));
            if op.invalidates_records() {
                self.resync().await;
            }
        }
        Ok(outcome)
    }

    fn notify(&self, notice: Notice) {
        debug!(level = ?notice.level, message = %notice.message, "notice");
        self.publish(AppEvent::Notice(notice));
    }

    fn publish(&self, event: AppEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
