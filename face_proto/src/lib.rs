//! Wire types for the `/process_snapshot` exchange with the recognition backend.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const PROCESS_SNAPSHOT_PATH: &str = "/process_snapshot";
pub const HEALTH_PATH: &str = "/health";
pub const UPLOAD_FACE_PATH: &str = "/upload_face";
pub const EMPLOYEES_PATH: &str = "/api/employees";
pub const ATTENDANCE_LOGS_PATH: &str = "/api/logs";

/// Identity label the backend uses when no face in its database matched.
pub const UNKNOWN_IDENTITY: &str = "Unknown";

const SUCCESS_STATUS: &str = "success";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    /// Data URL of the encoded frame (`data:image/jpeg;base64,...`).
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub name: String,
    /// Absent or null for the unknown sentinel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(deserialize_with = "deserialize_pixel")]
    pub x: i32,
    #[serde(deserialize_with = "deserialize_pixel")]
    pub y: i32,
    #[serde(deserialize_with = "deserialize_pixel")]
    pub w: i32,
    #[serde(deserialize_with = "deserialize_pixel")]
    pub h: i32,
}

/// Detections in the order the backend returned them.
pub type DetectionSet = Vec<Detection>;

fn deserialize_pixel<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom("pixel coordinate is not finite"));
    }
    Ok(value.round() as i32)
}

impl Detection {
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_IDENTITY
    }

    /// Similarity shown for a matched identity, `1 - distance` rounded to two
    /// decimals. `None` for the unknown sentinel, whose distance is meaningless,
    /// and for a match the backend sent without a distance.
    ///
    /// Assumes the backend normalizes `distance` into `[0, 1]`.
    pub fn match_score(&self) -> Option<f64> {
        if self.is_unknown() {
            return None;
        }
        self.distance
            .map(|distance| ((1.0 - distance) * 100.0).round() / 100.0)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ResponseError {
    #[error("{0}")]
    Service(String),
    #[error("success response without a detections array")]
    MissingDetections,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Missing, null or non-string statuses read as an empty status, which is
/// never `"success"`.
fn deserialize_status<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawStatus::deserialize(deserializer)? {
        RawStatus::Text(status) => status,
        RawStatus::Other(_) => String::new(),
    })
}

fn check_status(status: &str, message: Option<String>) -> Result<(), ResponseError> {
    if status == SUCCESS_STATUS {
        Ok(())
    } else {
        Err(ResponseError::Service(message.unwrap_or_default()))
    }
}

/// Tagged reply: `status == "success"` carries detections, anything else a message.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SnapshotResponse {
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detections: Option<DetectionSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SnapshotResponse {
    pub fn success(detections: DetectionSet) -> Self {
        Self {
            status: SUCCESS_STATUS.to_string(),
            detections: Some(detections),
            message: None,
        }
    }

    pub fn failure(status: &str, message: &str) -> Self {
        Self {
            status: status.to_string(),
            detections: None,
            message: Some(message.to_string()),
        }
    }

    pub fn into_result(self) -> Result<DetectionSet, ResponseError> {
        check_status(&self.status, self.message)?;
        self.detections.ok_or(ResponseError::MissingDetections)
    }
}

/// Body of `/upload_face`: registers `name` with one reference photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub name: String,
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub department: String,
    /// Data URL of the encoded frame, same encoding as [`SnapshotRequest`].
    pub image: String,
}

/// Plain `{status, message}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusReply {
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusReply {
    /// The backend's confirmation text on success.
    pub fn into_result(self) -> Result<String, ResponseError> {
        check_status(&self.status, self.message.clone())?;
        Ok(self.message.unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EmployeesResponse {
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employees: Option<Vec<Employee>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EmployeesResponse {
    pub fn into_result(self) -> Result<Vec<Employee>, ResponseError> {
        check_status(&self.status, self.message)?;
        Ok(self.employees.unwrap_or_default())
    }
}

/// One attendance entry, newest first in the backend's listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceLog {
    pub name: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttendanceLogsResponse {
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<AttendanceLog>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AttendanceLogsResponse {
    pub fn into_result(self) -> Result<Vec<AttendanceLog>, ResponseError> {
        check_status(&self.status, self.message)?;
        Ok(self.logs.unwrap_or_default())
    }
}
