//! Quota-bound capture loop that collects face samples for one subject.
//!
//! A run starts with an empty buffer, accepts one frame per manual capture and
//! completes exactly when the buffer holds [`TRAINING_QUOTA`] frames. Completion
//! releases the camera and sends the whole set in a single upload. Stopping a
//! run discards everything collected so far.

use std::sync::Arc;

use shared::{
    domain::SubjectId,
    protocol::{RegisterResponse, TrainingUploadRequest, TRAINING_QUOTA},
};
use tracing::{debug, info, warn};

use crate::{
    backend::AttendanceBackend,
    capture::CaptureSession,
    device::CaptureFrame,
    error::{ClientResult, NetworkError, ValidationError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    Idle,
    Capturing,
    Completed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingProgress {
    pub state: TrainingState,
    pub subject: Option<SubjectId>,
    pub captured: usize,
    pub quota: usize,
    /// A completed set whose upload failed and can be retried.
    pub upload_pending: bool,
}

impl TrainingProgress {
    pub fn percent(&self) -> u8 {
        ((self.captured * 100) / self.quota.max(1)) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingStep {
    /// Nothing happened: the pipeline was not capturing or the quota was already met.
    Ignored,
    Captured(TrainingProgress),
    Uploaded {
        progress: TrainingProgress,
        response: RegisterResponse,
    },
}

pub struct TrainingPipeline {
    session: CaptureSession,
    backend: Arc<dyn AttendanceBackend>,
    state: TrainingState,
    subject: Option<SubjectId>,
    captured: usize,
    frames: Vec<CaptureFrame>,
}

impl TrainingPipeline {
    pub fn new(session: CaptureSession, backend: Arc<dyn AttendanceBackend>) -> Self {
        Self {
            session,
            backend,
            state: TrainingState::Idle,
            subject: None,
            captured: 0,
            frames: Vec::with_capacity(TRAINING_QUOTA),
        }
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn progress(&self) -> TrainingProgress {
        TrainingProgress {
            state: self.state,
            subject: self.subject.clone(),
            captured: self.captured,
            quota: TRAINING_QUOTA,
            upload_pending: self.upload_pending(),
        }
    }

    pub fn upload_pending(&self) -> bool {
        self.state == TrainingState::Completed && !self.frames.is_empty()
    }

    /// Begins a fresh run for `subject`. A run already in progress is left alone.
    pub async fn start(&mut self, subject: SubjectId) -> ClientResult<TrainingProgress> {
        if self.state == TrainingState::Capturing {
            return Ok(self.progress());
        }
        if subject.is_blank() {
            return Err(ValidationError::MissingTrainingSubject.into());
        }

        self.frames.clear();
        self.captured = 0;
        self.subject = None;
        if let Err(err) = self.session.start().await {
            self.state = TrainingState::Idle;
            return Err(err.into());
        }

        info!(%subject, quota = TRAINING_QUOTA, "training run started");
        self.subject = Some(subject);
        self.state = TrainingState::Capturing;
        Ok(self.progress())
    }

    /// Appends one frame; the frame that meets the quota triggers completion and upload.
    pub async fn manual_capture(&mut self) -> ClientResult<TrainingStep> {
        if self.state != TrainingState::Capturing || self.captured >= TRAINING_QUOTA {
            return Ok(TrainingStep::Ignored);
        }

        let frame = self.session.grab()?;
        self.frames.push(frame);
        self.captured += 1;
        debug!(captured = self.captured, quota = TRAINING_QUOTA, "training frame captured");

        if self.captured < TRAINING_QUOTA {
            return Ok(TrainingStep::Captured(self.progress()));
        }

        self.state = TrainingState::Completed;
        self.session.stop();
        info!(subject = ?self.subject, "training quota reached");
        self.upload().await
    }

    /// Re-sends a completed set whose upload failed. Never invoked automatically.
    pub async fn retry_upload(&mut self) -> ClientResult<TrainingStep> {
        if !self.upload_pending() {
            return Ok(TrainingStep::Ignored);
        }
        self.upload().await
    }

    /// Abandons a capturing run. Returns false when there was nothing to stop.
    pub fn stop(&mut self) -> bool {
        if self.state != TrainingState::Capturing {
            return false;
        }
        self.frames.clear();
        self.captured = 0;
        self.session.stop();
        self.state = TrainingState::Stopped;
        info!(subject = ?self.subject, "training run stopped");
        true
    }

    async fn upload(&mut self) -> ClientResult<TrainingStep> {
        let Some(subject) = self.subject.clone() else {
            return Err(ValidationError::MissingTrainingSubject.into());
        };
        let request = TrainingUploadRequest {
            student_id: subject.clone(),
            photos_base64: self.frames.iter().map(CaptureFrame::to_data_url).collect(),
        };

        let result = self.backend.upload_training_set(request).await;
        match result {
            Ok(response) if response.ok => {
                info!(%subject, saved = response.saved, "training set uploaded");
                self.frames.clear();
                Ok(TrainingStep::Uploaded {
                    progress: self.progress(),
                    response,
                })
            }
            Ok(response) => {
                warn!(%subject, msg = %response.msg, "training upload refused");
                Err(NetworkError::Rejected(if response.msg.is_empty() {
                    "Training upload failed".to_string()
                } else {
                    response.msg
                })
                .into())
            }
            Err(err) => {
                warn!(%subject, %err, "training upload failed; set kept for retry");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/training_tests.rs"]
mod tests;
