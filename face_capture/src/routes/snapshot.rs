use crate::{
    frame::{encode_jpeg, jpeg_data_url, FrameError},
    render::{IdentityColor, RenderedResult},
    server::SharedState,
    session::{SessionError, SnapshotOutcome},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum SnapshotRouteError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Failed to encode annotated image: {0}")]
    Encode(#[from] FrameError),
}

#[derive(Debug, Serialize)]
pub struct SnapshotDetection {
    pub name: String,
    pub score: Option<f64>,
    pub label: String,
    pub color: &'static str,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SnapshotReply {
    Success {
        face_count: usize,
        summary: String,
        detections: Vec<SnapshotDetection>,
        image: String,
    },
    Busy {
        message: String,
    },
    Error {
        message: String,
    },
}

impl SnapshotReply {
    fn from_rendered(rendered: &RenderedResult, jpeg_quality: u8) -> Result<Self, FrameError> {
        let jpeg = encode_jpeg(&rendered.image, jpeg_quality)?;
        let detections = rendered
            .entries
            .iter()
            .map(|entry| SnapshotDetection {
                name: entry.name.clone(),
                score: entry.score,
                label: entry.to_string(),
                color: IdentityColor::hex(entry.color),
                x: entry.x,
                y: entry.y,
                w: entry.w,
                h: entry.h,
            })
            .collect();

        Ok(SnapshotReply::Success {
            face_count: rendered.face_count(),
            summary: rendered.summary(),
            detections,
            image: jpeg_data_url(&jpeg),
        })
    }
}

impl IntoResponse for SnapshotRouteError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            SnapshotRouteError::Session(e @ SessionError::Camera(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.alert())
            }
            SnapshotRouteError::Session(e @ SessionError::Aborted(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.alert())
            }
            SnapshotRouteError::Session(e) => (StatusCode::BAD_GATEWAY, e.alert()),
            SnapshotRouteError::Encode(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Something went wrong: {}", e),
            ),
        };
        (status, Json(SnapshotReply::Error { message })).into_response()
    }
}

#[instrument(skip(state))]
pub async fn snapshot(State(state): State<SharedState>) -> Result<Response, SnapshotRouteError> {
    match state.session.trigger().await? {
        SnapshotOutcome::Completed(rendered) => {
            let reply = SnapshotReply::from_rendered(&rendered, state.jpeg_quality)?;
            Ok(Json(reply).into_response())
        }
        SnapshotOutcome::Dropped => Ok((
            StatusCode::CONFLICT,
            Json(SnapshotReply::Busy {
                message: "A snapshot is already being processed.".to_string(),
            }),
        )
            .into_response()),
    }
}
