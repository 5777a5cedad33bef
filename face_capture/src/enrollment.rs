use crate::{
    camera::{CameraError, FrameSource},
    inference::{InferenceClient, InferenceError},
    session::SessionError,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

const NAME_REQUIRED: &str = "Name is required";

/// Profile submitted from the admin page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Enrollee {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub department: String,
}

impl Enrollee {
    fn normalized(self) -> Result<Self, EnrollmentError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(EnrollmentError::MissingName);
        }
        Ok(Self {
            name,
            employee_id: self.employee_id.trim().to_string(),
            department: self.department.trim().to_string(),
        })
    }
}

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("Name is required")]
    MissingName,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<CameraError> for EnrollmentError {
    fn from(err: CameraError) -> Self {
        EnrollmentError::Session(err.into())
    }
}

impl From<InferenceError> for EnrollmentError {
    fn from(err: InferenceError) -> Self {
        EnrollmentError::Session(err.into())
    }
}

impl EnrollmentError {
    pub fn alert(&self) -> String {
        match self {
            EnrollmentError::MissingName => NAME_REQUIRED.to_string(),
            EnrollmentError::Session(e) => e.alert(),
        }
    }
}

/// Captures the current frame and registers it under `enrollee`. A blank name
/// is rejected before the camera is touched.
#[instrument(skip(source, client))]
pub async fn enroll(
    source: &dyn FrameSource,
    client: &InferenceClient,
    enrollee: Enrollee,
) -> Result<String, EnrollmentError> {
    let enrollee = enrollee.normalized()?;
    let frame = source.acquire()?;
    let message = client.upload_face(&enrollee, &frame).await?;
    tracing::info!("Enrolled {}", enrollee.name);
    Ok(message)
}
