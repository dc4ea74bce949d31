//! JSON-over-HTTP contract with the attendance service.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    error::ApiErrorBody,
    protocol::{
        AdminLoginRequest, AdminLoginResponse, AttendanceStats, MaintenanceResponse, MarkRequest,
        MarkResponse, RecordsResponse, RegisterResponse, RegisterStudentRequest, Student,
        TrainingUploadRequest,
    },
};
use tracing::{debug, warn};

use crate::{
    admin::{AdminToken, MaintenanceOp},
    config::ClientSettings,
    error::{ClientResult, NetworkError},
};

#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    async fn list_students(&self) -> ClientResult<Vec<Student>>;
    async fn list_records(&self, date: Option<NaiveDate>) -> ClientResult<RecordsResponse>;
    async fn stats(&self) -> ClientResult<AttendanceStats>;
    async fn register_student(
        &self,
        request: RegisterStudentRequest,
    ) -> ClientResult<RegisterResponse>;
    async fn mark(&self, request: MarkRequest) -> ClientResult<MarkResponse>;
    async fn upload_training_set(
        &self,
        request: TrainingUploadRequest,
    ) -> ClientResult<RegisterResponse>;
    async fn login(&self, request: AdminLoginRequest) -> ClientResult<AdminLoginResponse>;
    async fn maintenance(
        &self,
        op: MaintenanceOp,
        token: &AdminToken,
    ) -> ClientResult<MaintenanceResponse>;
}

pub struct HttpBackend {
    http: Client,
    settings: ClientSettings,
}

impl HttpBackend {
    pub fn new(settings: ClientSettings) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(NetworkError::from)?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = self.settings.api_url(path);
        debug!(%url, "GET");
        let response = self.http.get(&url).send().await?;
        read_json(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.settings.api_url(path);
        debug!(%url, "POST");
        let response = self.http.post(&url).json(body).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message());
    warn!(status = status.as_u16(), ?detail, "request failed");
    Err(NetworkError::status(status.as_u16(), detail).into())
}

#[async_trait]
impl AttendanceBackend for HttpBackend {
    async fn list_students(&self) -> ClientResult<Vec<Student>> {
        self.get_json("/students").await
    }

    async fn list_records(&self, date: Option<NaiveDate>) -> ClientResult<RecordsResponse> {
        let url = self.settings.api_url("/records");
        let mut request = self.http.get(&url);
        if let Some(date) = date {
            request = request.query(&[("date", date.format("%Y-%m-%d").to_string())]);
        }
        debug!(%url, ?date, "GET");
        let response = request.send().await?;
        read_json(response).await
    }

    async fn stats(&self) -> ClientResult<AttendanceStats> {
        self.get_json("/stats").await
    }

    async fn register_student(
        &self,
        request: RegisterStudentRequest,
    ) -> ClientResult<RegisterResponse> {
        self.post_json("/register_student", &request).await
    }

    async fn mark(&self, request: MarkRequest) -> ClientResult<MarkResponse> {
        self.post_json("/mark", &request).await
    }

    async fn upload_training_set(
        &self,
        request: TrainingUploadRequest,
    ) -> ClientResult<RegisterResponse> {
        self.post_json("/capture_50_images", &request).await
    }

    async fn login(&self, request: AdminLoginRequest) -> ClientResult<AdminLoginResponse> {
        self.post_json("/login", &request).await
    }

    async fn maintenance(
        &self,
        op: MaintenanceOp,
        token: &AdminToken,
    ) -> ClientResult<MaintenanceResponse> {
        let url = self.settings.api_url(op.path());
        debug!(%url, %op, "POST (bearer)");
        let response = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
