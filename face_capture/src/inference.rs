use crate::config::InferenceConfig;
use crate::enrollment::Enrollee;
use crate::frame::{Frame, FrameError};
use async_trait::async_trait;
use face_proto::{
    AttendanceLog, AttendanceLogsResponse, DetectionSet, Employee, EmployeesResponse,
    EnrollmentRequest, ResponseError, SnapshotRequest, SnapshotResponse, StatusReply,
    ATTENDANCE_LOGS_PATH, EMPLOYEES_PATH, HEALTH_PATH, PROCESS_SNAPSHOT_PATH, UPLOAD_FACE_PATH,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::instrument;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Recognition service error: {0}")]
    ServiceError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] FrameError),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        InferenceError::TransportError(err.to_string())
    }
}

impl From<ResponseError> for InferenceError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Service(message) => InferenceError::ServiceError(message),
            missing @ ResponseError::MissingDetections => {
                InferenceError::TransportError(missing.to_string())
            }
        }
    }
}

/// One round trip to the recognition backend per call. Implementations must
/// not retry; the caller decides whether to invoke again.
#[async_trait]
pub trait Inference: Send + Sync + 'static {
    async fn infer(&self, frame: &Frame) -> Result<DetectionSet, InferenceError>;
}

pub struct InferenceClient {
    http: reqwest::Client,
    base_url: String,
    jpeg_quality: u8,
}

impl InferenceClient {
    pub fn new(config: &InferenceConfig, jpeg_quality: u8) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.get_base_url(),
            jpeg_quality,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probes the backend's health route with jittered backoff. Only reports;
    /// the station serves either way.
    pub async fn check_health(&self, max_retries: u32) -> bool {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let mut retry_delay = Duration::from_millis(100);
        let max_retry_delay = Duration::from_secs(2);

        for attempt in 0..=max_retries {
            match self.http.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Recognition backend at {} is healthy", self.base_url);
                    return true;
                }
                Ok(response) => {
                    tracing::warn!("Health check returned {}", response.status());
                }
                Err(e) => {
                    tracing::warn!("Health check failed: {:?}", e);
                }
            }

            if attempt == max_retries {
                break;
            }
            let jitter = rand::random::<f32>() * 0.2 + 0.9;
            sleep(retry_delay.mul_f32(jitter)).await;
            retry_delay = (retry_delay * 2).min(max_retry_delay);
        }

        tracing::warn!(
            "Recognition backend at {} did not answer its health check",
            self.base_url
        );
        false
    }

    /// Registers one reference photo for `enrollee`. Sent once, never retried.
    #[instrument(skip(self, frame), fields(name = %enrollee.name))]
    pub async fn upload_face(
        &self,
        enrollee: &Enrollee,
        frame: &Frame,
    ) -> Result<String, InferenceError> {
        let request = EnrollmentRequest {
            name: enrollee.name.clone(),
            employee_id: enrollee.employee_id.clone(),
            department: enrollee.department.clone(),
            image: frame.to_data_url(self.jpeg_quality)?,
        };
        let url = format!("{}{}", self.base_url, UPLOAD_FACE_PATH);

        let reply: StatusReply = self.http.post(&url).json(&request).send().await?.json().await?;
        Ok(reply.into_result()?)
    }

    pub async fn employees(&self) -> Result<Vec<Employee>, InferenceError> {
        let reply: EmployeesResponse = self.get_json(EMPLOYEES_PATH).await?;
        Ok(reply.into_result()?)
    }

    pub async fn attendance_logs(&self) -> Result<Vec<AttendanceLog>, InferenceError> {
        let reply: AttendanceLogsResponse = self.get_json(ATTENDANCE_LOGS_PATH).await?;
        Ok(reply.into_result()?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, InferenceError> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self.http.get(&url).send().await?.json().await?)
    }
}

#[async_trait]
impl Inference for InferenceClient {
    #[instrument(skip(self, frame), fields(width = frame.width(), height = frame.height()))]
    async fn infer(&self, frame: &Frame) -> Result<DetectionSet, InferenceError> {
        let request = SnapshotRequest {
            image: frame.to_data_url(self.jpeg_quality)?,
        };
        let url = format!("{}{}", self.base_url, PROCESS_SNAPSHOT_PATH);

        // Failure replies come with a 5xx status but still carry the JSON body.
        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        let body: SnapshotResponse = response.json().await?;
        tracing::debug!("Backend answered {} with status {:?}", status, body.status);

        let detections = body.into_result()?;
        tracing::debug!("Received {} detections", detections.len());
        Ok(detections)
    }
}
