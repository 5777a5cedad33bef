use crate::{
    camera::{CameraError, FrameSource},
    inference::{Inference, InferenceError},
    render::{render, RenderedResult},
    telemetry::Metrics,
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Instant};
use thiserror::Error;
use tracing::{instrument, Instrument};

const CONNECTION_FAILED_ALERT: &str = "Failed to connect to backend server.";
const CAMERA_ALERT: &str =
    "Could not access camera. Please ensure the device is connected and readable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("Recognition service error: {0}")]
    Service(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Snapshot cycle aborted: {0}")]
    Aborted(String),
}

impl From<InferenceError> for SessionError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ServiceError(message) => SessionError::Service(message),
            InferenceError::TransportError(message) => SessionError::Transport(message),
            InferenceError::Encode(e) => SessionError::Transport(e.to_string()),
        }
    }
}

impl SessionError {
    /// Text shown to whoever pressed the button.
    pub fn alert(&self) -> String {
        match self {
            SessionError::Camera(_) => CAMERA_ALERT.to_string(),
            SessionError::Service(message) => format!("Error: {}", message),
            SessionError::Transport(_) => CONNECTION_FAILED_ALERT.to_string(),
            SessionError::Aborted(message) => format!("Error: {}", message),
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            SessionError::Camera(_) => "camera_error",
            SessionError::Service(_) => "service_error",
            SessionError::Transport(_) => "transport_error",
            SessionError::Aborted(_) => "aborted",
        }
    }
}

#[derive(Debug)]
pub enum SnapshotOutcome {
    Completed(RenderedResult),
    /// A cycle was already in flight; nothing was captured or sent.
    Dropped,
}

/// Runs capture, inference and render as one cycle, at most one at a time.
///
/// A cycle runs on its own task, so dropping the caller's future (a client
/// hanging up mid-request) never cuts the backend call short; the state stays
/// `Capturing` until the round trip ends.
pub struct SessionController {
    source: Arc<dyn FrameSource>,
    inference: Arc<dyn Inference>,
    state: Arc<Mutex<SessionState>>,
    metrics: Option<Arc<Metrics>>,
}

/// Puts the controller back to `Idle` however the cycle ends.
struct CaptureGuard {
    state: Arc<Mutex<SessionState>>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        *self.state.lock() = SessionState::Idle;
    }
}

impl SessionController {
    pub fn new(source: Arc<dyn FrameSource>, inference: Arc<dyn Inference>) -> Self {
        Self {
            source,
            inference,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    fn try_begin(&self) -> Option<CaptureGuard> {
        let mut state = self.state.lock();
        if *state == SessionState::Capturing {
            return None;
        }
        *state = SessionState::Capturing;
        Some(CaptureGuard {
            state: Arc::clone(&self.state),
        })
    }

    #[instrument(skip(self))]
    pub async fn trigger(self: &Arc<Self>) -> Result<SnapshotOutcome, SessionError> {
        let Some(guard) = self.try_begin() else {
            tracing::debug!("Snapshot already in progress, dropping trigger");
            self.record_outcome("dropped");
            return Ok(SnapshotOutcome::Dropped);
        };

        let session = Arc::clone(self);
        let cycle = tokio::spawn(
            async move {
                let _guard = guard;
                session.complete_cycle().await
            }
            .in_current_span(),
        );

        match cycle.await {
            Ok(result) => result.map(SnapshotOutcome::Completed),
            Err(e) => {
                tracing::error!("Snapshot task failed: {:?}", e);
                let err = SessionError::Aborted(e.to_string());
                self.record_outcome(err.outcome_label());
                Err(err)
            }
        }
    }

    async fn complete_cycle(&self) -> Result<RenderedResult, SessionError> {
        let started = Instant::now();
        let result = self.run_cycle().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(rendered) => {
                tracing::info!(
                    "Snapshot completed with {} faces in {} ms",
                    rendered.face_count(),
                    elapsed_ms
                );
                self.record_outcome("completed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_snapshot_duration(elapsed_ms);
                    metrics.record_faces_detected(rendered.face_count() as u64);
                }
            }
            Err(e) => {
                tracing::error!("Snapshot failed: {:?}", e);
                self.record_outcome(e.outcome_label());
            }
        }

        result
    }

    async fn run_cycle(&self) -> Result<RenderedResult, SessionError> {
        let frame = self.source.acquire()?;
        let detections = self.inference.infer(&frame).await?;
        Ok(render(&frame, &detections))
    }

    fn record_outcome(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_snapshot(outcome);
        }
    }
}
