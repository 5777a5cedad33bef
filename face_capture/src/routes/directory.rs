use crate::{inference::InferenceError, server::SharedState, session::SessionError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use face_proto::{AttendanceLogsResponse, EmployeesResponse, StatusReply};

/// Backend listing failures, shown with the same alerts as a snapshot.
pub struct DirectoryError(SessionError);

impl From<InferenceError> for DirectoryError {
    fn from(err: InferenceError) -> Self {
        DirectoryError(err.into())
    }
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        tracing::error!("Directory lookup failed: {:?}", self.0);
        let reply = StatusReply {
            status: "error".to_string(),
            message: Some(self.0.alert()),
        };
        (StatusCode::BAD_GATEWAY, Json(reply)).into_response()
    }
}

pub async fn employees(
    State(state): State<SharedState>,
) -> Result<Json<EmployeesResponse>, DirectoryError> {
    let employees = state.backend.employees().await?;
    Ok(Json(EmployeesResponse {
        status: "success".to_string(),
        employees: Some(employees),
        message: None,
    }))
}

pub async fn attendance(
    State(state): State<SharedState>,
) -> Result<Json<AttendanceLogsResponse>, DirectoryError> {
    let logs = state.backend.attendance_logs().await?;
    Ok(Json(AttendanceLogsResponse {
        status: "success".to_string(),
        logs: Some(logs),
        message: None,
    }))
}
