//! Admin session guard for destructive maintenance operations.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use shared::protocol::AdminLoginRequest;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::{
    backend::AttendanceBackend,
    error::{AdminAuthError, ClientError, ClientResult, NetworkError, ValidationError},
};

/// Opaque bearer credential. Never printed, wiped on drop.
pub struct AdminToken(String);

impl AdminToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl Drop for AdminToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminToken(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaintenanceOp {
    ResetDatabase,
    DeleteFaces,
    DeleteAttendance,
}

impl MaintenanceOp {
    pub fn path(self) -> &'static str {
        match self {
            MaintenanceOp::ResetDatabase => "/reset_database",
            MaintenanceOp::DeleteFaces => "/delete_faces",
            MaintenanceOp::DeleteAttendance => "/delete_attendance",
        }
    }

    pub fn confirmation_prompt(self) -> &'static str {
        match self {
            MaintenanceOp::ResetDatabase => {
                "Are you sure you want to reset the entire database? This action cannot be undone!"
            }
            MaintenanceOp::DeleteFaces => {
                "Are you sure you want to delete all enrolled faces? This will require retraining the model."
            }
            MaintenanceOp::DeleteAttendance => {
                "Are you sure you want to delete all attendance records?"
            }
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            MaintenanceOp::ResetDatabase => "Database reset successfully!",
            MaintenanceOp::DeleteFaces => "All faces deleted successfully!",
            MaintenanceOp::DeleteAttendance => "Attendance records deleted successfully!",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            MaintenanceOp::ResetDatabase => "Failed to reset database",
            MaintenanceOp::DeleteFaces => "Failed to delete faces",
            MaintenanceOp::DeleteAttendance => "Failed to delete attendance records",
        }
    }

    /// Shown when the request never produced a usable response.
    pub fn error_message(self) -> &'static str {
        match self {
            MaintenanceOp::ResetDatabase => "Error resetting database",
            MaintenanceOp::DeleteFaces => "Error deleting faces",
            MaintenanceOp::DeleteAttendance => "Error deleting attendance records",
        }
    }

    /// Whether synced records are stale after the operation.
    pub fn invalidates_records(self) -> bool {
        matches!(
            self,
            MaintenanceOp::ResetDatabase | MaintenanceOp::DeleteAttendance
        )
    }
}

impl fmt::Display for MaintenanceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

/// Explicit user confirmation step shown before a destructive dispatch.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSnapshot {
    pub authenticated: bool,
    pub identity: Option<String>,
}

pub struct AdminSession {
    backend: Arc<dyn AttendanceBackend>,
    token: Option<AdminToken>,
    identity: Option<String>,
}

impl AdminSession {
    pub fn new(backend: Arc<dyn AttendanceBackend>) -> Self {
        Self {
            backend,
            token: None,
            identity: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn snapshot(&self) -> AdminSnapshot {
        AdminSnapshot {
            authenticated: self.is_authenticated(),
            identity: self.identity.clone(),
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<()> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let response = self
            .backend
            .login(AdminLoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
            .map_err(|err| match err {
                ClientError::Network(NetworkError::Status { code, .. })
                    if code.is_auth_failure() =>
                {
                    ClientError::AdminAuth(AdminAuthError::InvalidCredentials)
                }
                other => other,
            })?;

        match response.token.filter(|token| response.ok && !token.is_empty()) {
            Some(token) => {
                self.token = Some(AdminToken::new(token));
                self.identity = Some(email.to_string());
                info!(identity = email, "admin session established");
                Ok(())
            }
            None => {
                warn!(identity = email, "admin login refused");
                Err(AdminAuthError::InvalidCredentials.into())
            }
        }
    }

    pub fn logout(&mut self) {
        if self.token.take().is_some() {
            info!("admin session cleared");
        }
        self.identity = None;
    }

    /// Runs a destructive operation after the user confirms it.
    ///
    /// A rejected token is reported as [`AdminAuthError::TokenRejected`]; the
    /// session is left as-is so the caller decides whether to log out.
    pub async fn run(
        &self,
        op: MaintenanceOp,
        prompt: &dyn ConfirmationPrompt,
    ) -> ClientResult<MaintenanceOutcome> {
        let token = self
            .token
            .as_ref()
            .ok_or(AdminAuthError::NotAuthenticated)?;

        if !prompt.confirm(op.confirmation_prompt()).await {
            info!(%op, "maintenance cancelled by user");
            return Ok(MaintenanceOutcome::Cancelled);
        }

        let response = self
            .backend
            .maintenance(op, token)
            .await
            .map_err(|err| match err {
                ClientError::Network(NetworkError::Status { code, .. })
                    if code.is_auth_failure() =>
                {
                    warn!(%op, "admin token rejected");
                    ClientError::AdminAuth(AdminAuthError::TokenRejected)
                }
                other => other,
            })?;

        if !response.ok {
            let detail = response.message.unwrap_or_default();
            warn!(%op, %detail, "maintenance refused by server");
            return Err(NetworkError::Rejected(op.failure_message().to_string()).into());
        }

        info!(%op, "maintenance completed");
        Ok(MaintenanceOutcome::Completed)
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
