use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::SubjectId;

/// Number of frames the bulk training upload carries.
pub const TRAINING_QUOTA: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub roll_no: SubjectId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRow {
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub status: String,
}

impl AttendanceRow {
    /// Parses the backend's ISO-8601 timestamp, with or without an offset.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.trim();
        if raw.is_empty() {
            return None;
        }
        raw.parse::<NaiveDateTime>()
            .ok()
            .or_else(|| {
                chrono::DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_utc())
            })
    }

    pub fn recorded_on(&self, day: NaiveDate) -> bool {
        self.timestamp
            .starts_with(&day.format("%Y-%m-%d").to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsResponse {
    #[serde(default)]
    pub rows: Vec<AttendanceRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStats {
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub attendance_rate: f64,
    #[serde(default)]
    pub present_today: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterStudentRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    pub class_name: String,
    #[serde(default)]
    pub photo_base64: Option<String>,
}

/// Response shared by enrollment and the bulk training upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub saved: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkRequest {
    pub photo_base64: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkStatus {
    Present,
    Debounced,
    Uncertain,
    NoFace,
    Other,
}

impl MarkStatus {
    pub fn is_recorded(self) -> bool {
        matches!(self, MarkStatus::Present | MarkStatus::Debounced)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl MarkResponse {
    pub fn mark_status(&self) -> MarkStatus {
        match self.status.as_str() {
            "Present" => MarkStatus::Present,
            "Debounced" => MarkStatus::Debounced,
            "Uncertain" => MarkStatus::Uncertain,
            "NoFace" => MarkStatus::NoFace,
            _ => MarkStatus::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingUploadRequest {
    pub student_id: SubjectId,
    pub photos_base64: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_status_classifies_known_tags() {
        let response: MarkResponse =
            serde_json::from_str(r#"{"student_id":"S1","status":"Present","confidence":0.9}"#)
                .expect("parse");
        assert_eq!(response.mark_status(), MarkStatus::Present);
        assert!(response.mark_status().is_recorded());

        let uncertain: MarkResponse =
            serde_json::from_str(r#"{"student_id":null,"status":"Uncertain"}"#).expect("parse");
        assert_eq!(uncertain.mark_status(), MarkStatus::Uncertain);
        assert!(!uncertain.mark_status().is_recorded());

        let odd: MarkResponse = serde_json::from_str(r#"{"status":"Spoof"}"#).expect("parse");
        assert_eq!(odd.mark_status(), MarkStatus::Other);
    }

    #[test]
    fn records_tolerate_missing_fields() {
        let records: RecordsResponse =
            serde_json::from_str(r#"{"rows":[{"person_id":"S1"}],"date":"2024-03-01"}"#)
                .expect("parse");
        assert_eq!(records.rows[0].status, "");
        assert_eq!(records.date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn row_timestamps_parse_naive_and_offset_forms() {
        let naive = AttendanceRow {
            person_id: "S1".into(),
            timestamp: "2024-03-01T09:15:30.123456".into(),
            status: "Present".into(),
        };
        let parsed = naive.parsed_timestamp().expect("naive timestamp");
        assert_eq!(parsed.format("%H:%M").to_string(), "09:15");
        assert!(naive.recorded_on(NaiveDate::from_ymd_opt(2024, 3, 1).expect("date")));

        let offset = AttendanceRow {
            timestamp: "2024-03-01T09:15:30+00:00".into(),
            ..naive.clone()
        };
        assert!(offset.parsed_timestamp().is_some());

        let empty = AttendanceRow {
            timestamp: String::new(),
            ..naive
        };
        assert!(empty.parsed_timestamp().is_none());
    }

    #[test]
    fn training_upload_serializes_subject_as_plain_string() {
        let request = TrainingUploadRequest {
            student_id: SubjectId::new("S7"),
            photos_base64: vec!["a".into()],
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["student_id"], "S7");
    }
}
