use crate::{
    enrollment::{enroll, Enrollee, EnrollmentError},
    server::SharedState,
    session::SessionError,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use face_proto::StatusReply;

impl IntoResponse for EnrollmentError {
    fn into_response(self) -> Response {
        let status = match &self {
            EnrollmentError::MissingName => StatusCode::BAD_REQUEST,
            EnrollmentError::Session(SessionError::Camera(_)) => StatusCode::SERVICE_UNAVAILABLE,
            EnrollmentError::Session(_) => StatusCode::BAD_GATEWAY,
        };
        let reply = StatusReply {
            status: "error".to_string(),
            message: Some(self.alert()),
        };
        (status, Json(reply)).into_response()
    }
}

pub async fn enroll_face(
    State(state): State<SharedState>,
    Json(enrollee): Json<Enrollee>,
) -> Result<Json<StatusReply>, EnrollmentError> {
    let message = enroll(state.source.as_ref(), &state.backend, enrollee).await?;
    Ok(Json(StatusReply {
        status: "success".to_string(),
        message: Some(message),
    }))
}
