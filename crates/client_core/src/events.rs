//! Events published to the presentation layer, and notice modeling.

use std::sync::Arc;

use crate::{
    admin::AdminSnapshot,
    capture::CaptureSnapshot,
    error::{ClientError, NetworkError},
    mark_gate::MarkGateSnapshot,
    navigation::NavigationSnapshot,
    records::RecordsView,
    sync::DataSnapshot,
    training::TrainingProgress,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Notice for a failed operation; `fallback` replaces transport-level noise.
    pub fn from_error(err: &ClientError, fallback: &str) -> Self {
        let message = match err {
            ClientError::Network(NetworkError::Transport(_) | NetworkError::Decode(_)) => {
                fallback.to_string()
            }
            other => other.to_string(),
        };
        Self::error(message)
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Notice(Notice),
    PageChanged(NavigationSnapshot),
    RecordsView(RecordsView),
    DataRefreshed(Arc<DataSnapshot>),
    MarkGateChanged(MarkGateSnapshot),
    CaptureChanged(CaptureSnapshot),
    TrainingProgress(TrainingProgress),
    AdminChanged(AdminSnapshot),
}
