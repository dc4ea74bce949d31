use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "attendance.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub server_url: String,
    pub api_prefix: String,
    pub request_timeout_secs: u64,
    pub frame_ready_timeout_ms: u64,
    pub camera_width: u32,
    pub camera_height: u32,
    pub jpeg_quality: f32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            api_prefix: "/web".into(),
            request_timeout_secs: 30,
            frame_ready_timeout_ms: 10_000,
            camera_width: 640,
            camera_height: 480,
            jpeg_quality: 0.8,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn frame_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_ready_timeout_ms)
    }

    /// Joins server url, api prefix and `path` with exactly one slash between parts.
    pub fn api_url(&self, path: &str) -> String {
        let base = self.server_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        if prefix.is_empty() {
            format!("{base}/{path}")
        } else {
            format!("{base}/{prefix}/{path}")
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.server_url)
            .with_context(|| format!("invalid server url '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("server url must use http or https, got '{}'", url.scheme());
        }
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            bail!("jpeg quality must be in (0, 1], got {}", self.jpeg_quality);
        }
        if self.camera_width == 0 || self.camera_height == 0 {
            bail!(
                "camera resolution must be non-zero, got {}x{}",
                self.camera_width,
                self.camera_height
            );
        }
        Ok(())
    }
}

/// Loads settings from `path` (if readable) and then `APP__*` environment overrides.
pub fn load_settings(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                let flat: HashMap<String, String> = file_cfg
                    .into_iter()
                    .map(|(key, value)| {
                        let value = match value {
                            toml::Value::String(text) => text,
                            other => other.to_string(),
                        };
                        (key, value)
                    })
                    .collect();
                apply_overrides(&mut settings, |key| flat.get(key).cloned());
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unparsable settings file");
            }
        }
    }

    apply_overrides(&mut settings, |key| {
        std::env::var(format!("APP__{}", key.to_ascii_uppercase())).ok()
    });

    settings
}

pub(crate) fn apply_overrides(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("server_url") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("api_prefix") {
        settings.api_prefix = v;
    }
    if let Some(v) = lookup("request_timeout_secs").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = lookup("frame_ready_timeout_ms").and_then(|v| v.parse().ok()) {
        settings.frame_ready_timeout_ms = v;
    }
    if let Some(v) = lookup("camera_width").and_then(|v| v.parse().ok()) {
        settings.camera_width = v;
    }
    if let Some(v) = lookup("camera_height").and_then(|v| v.parse().ok()) {
        settings.camera_height = v;
    }
    if let Some(v) = lookup("jpeg_quality").and_then(|v| v.parse().ok()) {
        settings.jpeg_quality = v;
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    #[test]
    fn api_url_normalizes_slashes() {
        let mut settings = ClientSettings {
            server_url: "http://host:8000/".into(),
            ..ClientSettings::default()
        };
        assert_eq!(settings.api_url("/students"), "http://host:8000/web/students");

        settings.api_prefix = "/api/v1/".into();
        assert_eq!(settings.api_url("mark"), "http://host:8000/api/v1/mark");

        settings.api_prefix = String::new();
        assert_eq!(settings.api_url("/stats"), "http://host:8000/stats");
    }

    #[test]
    fn overrides_ignore_unparsable_numbers() {
        let mut settings = ClientSettings::default();
        let values: HashMap<&str, &str> = [
            ("server_url", "https://attendance.example"),
            ("request_timeout_secs", "five"),
            ("jpeg_quality", "0.6"),
        ]
        .into_iter()
        .collect();

        apply_overrides(&mut settings, |key| values.get(key).map(|v| v.to_string()));

        assert_eq!(settings.server_url, "https://attendance.example");
        assert_eq!(settings.request_timeout_secs, 30);
        assert!((settings.jpeg_quality - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn validate_rejects_bad_urls_and_quality() {
        assert!(ClientSettings::default().validate().is_ok());

        let bad_scheme = ClientSettings {
            server_url: "ftp://host".into(),
            ..ClientSettings::default()
        };
        assert!(bad_scheme.validate().is_err());

        let bad_quality = ClientSettings {
            jpeg_quality: 1.5,
            ..ClientSettings::default()
        };
        assert!(bad_quality.validate().is_err());
    }

    #[test]
    fn reads_typed_values_from_settings_file() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("attendance_settings_test_{suffix}.toml"));
        fs::write(
            &path,
            "server_url = \"http://10.0.0.5:9000\"\nframe_ready_timeout_ms = 2500\n",
        )
        .expect("write settings");

        let settings = load_settings(&path);
        assert_eq!(settings.server_url, "http://10.0.0.5:9000");
        assert_eq!(settings.frame_ready_timeout_ms, 2500);

        fs::remove_file(path).expect("cleanup");
    }
}
