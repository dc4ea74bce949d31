use super::*;
use crate::test_support::{lock, transport_error, FakeBackend, FixedPrompt};
use shared::protocol::{AdminLoginResponse, MaintenanceResponse};

async fn logged_in(backend: &Arc<FakeBackend>) -> AdminSession {
    let mut session = AdminSession::new(backend.clone());
    session
        .login("admin@local", "Admin@123")
        .await
        .expect("login");
    session
}

#[tokio::test]
async fn wrong_credentials_leave_the_session_unauthenticated() {
    let backend = FakeBackend::new();
    *lock(&backend.login_result) = Ok(AdminLoginResponse {
        ok: false,
        token: None,
        message: Some("Invalid credentials".into()),
    });
    let mut session = AdminSession::new(backend.clone());

    let err = session
        .login("admin@local", "wrong")
        .await
        .expect_err("refused");
    assert_eq!(err, ClientError::AdminAuth(AdminAuthError::InvalidCredentials));
    assert!(!session.is_authenticated());
    assert_eq!(
        session.snapshot(),
        AdminSnapshot {
            authenticated: false,
            identity: None,
        }
    );
}

#[tokio::test]
async fn unauthorized_status_maps_to_invalid_credentials() {
    let backend = FakeBackend::new();
    *lock(&backend.login_result) = Err(NetworkError::status(401, None).into());
    let mut session = AdminSession::new(backend.clone());

    let err = session.login("admin@local", "x").await.expect_err("401");
    assert_eq!(err, ClientError::AdminAuth(AdminAuthError::InvalidCredentials));
}

#[tokio::test]
async fn blank_credentials_never_reach_the_backend() {
    let backend = FakeBackend::new();
    let mut session = AdminSession::new(backend.clone());

    let err = session.login("  ", "pw").await.expect_err("blank email");
    assert_eq!(err, ClientError::Validation(ValidationError::MissingCredentials));
    assert!(lock(&backend.logins).is_empty());
}

#[tokio::test]
async fn login_then_logout_clears_the_token() {
    let backend = FakeBackend::new();
    let mut session = logged_in(&backend).await;
    assert!(session.is_authenticated());
    assert_eq!(session.snapshot().identity.as_deref(), Some("admin@local"));

    session.logout();
    assert!(!session.is_authenticated());
    let err = session
        .run(MaintenanceOp::DeleteFaces, FixedPrompt::new(false).as_ref())
        .await
        .expect_err("logged out");
    assert_eq!(err, ClientError::AdminAuth(AdminAuthError::NotAuthenticated));
}

#[tokio::test]
async fn declined_confirmation_cancels_without_dispatch() {
    let backend = FakeBackend::new();
    let session = logged_in(&backend).await;
    let prompt = FixedPrompt::new(false);

    let outcome = session
        .run(MaintenanceOp::ResetDatabase, prompt.as_ref())
        .await
        .expect("cancelled");
    assert_eq!(outcome, MaintenanceOutcome::Cancelled);
    assert!(lock(&backend.maintenance_calls).is_empty());
    assert_eq!(
        lock(&prompt.asked).as_slice(),
        [MaintenanceOp::ResetDatabase.confirmation_prompt().to_string()]
    );
}

#[tokio::test]
async fn confirmed_operation_carries_the_session_token() {
    let backend = FakeBackend::new();
    let session = logged_in(&backend).await;

    let outcome = session
        .run(MaintenanceOp::DeleteAttendance, FixedPrompt::new(true).as_ref())
        .await
        .expect("completed");
    assert_eq!(outcome, MaintenanceOutcome::Completed);
    assert_eq!(
        lock(&backend.maintenance_calls).as_slice(),
        [(MaintenanceOp::DeleteAttendance, "admin_token_123".to_string())]
    );
}

#[tokio::test]
async fn rejected_token_keeps_the_session() {
    let backend = FakeBackend::new();
    let session = logged_in(&backend).await;
    *lock(&backend.maintenance_result) = Err(NetworkError::status(403, None).into());

    let err = session
        .run(MaintenanceOp::DeleteFaces, FixedPrompt::new(true).as_ref())
        .await
        .expect_err("forbidden");
    assert_eq!(err, ClientError::AdminAuth(AdminAuthError::TokenRejected));
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn refused_operation_reports_its_failure_message() {
    let backend = FakeBackend::new();
    let session = logged_in(&backend).await;
    *lock(&backend.maintenance_result) = Ok(MaintenanceResponse {
        ok: false,
        message: Some("locked".into()),
    });

    let err = session
        .run(MaintenanceOp::ResetDatabase, FixedPrompt::new(true).as_ref())
        .await
        .expect_err("refused");
    assert_eq!(err.to_string(), "Failed to reset database");

    *lock(&backend.maintenance_result) = Err(transport_error().into());
    let err = session
        .run(MaintenanceOp::ResetDatabase, FixedPrompt::new(true).as_ref())
        .await
        .expect_err("transport");
    assert!(matches!(err, ClientError::Network(NetworkError::Transport(_))));
}

#[test]
fn token_debug_output_is_redacted() {
    let token = AdminToken::new("admin_token_123");
    assert_eq!(format!("{token:?}"), "AdminToken(<redacted>)");
}
