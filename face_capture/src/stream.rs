use crate::camera::{CameraError, FrameSource};
use crate::frame::FrameError;
use bytes::Bytes;
use futures::stream;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::sleep;
use tracing::instrument;

pub const FRAME_BOUNDARY: &str = "frame";

/// Live preview of the camera as a multipart JPEG stream.
#[derive(Clone)]
pub struct VideoStream {
    pub source: Arc<dyn FrameSource>,
    pub video_stream_delay: u64,
    pub jpeg_quality: u8,
}

#[derive(Error, Debug)]
pub enum VideoStreamError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Http builder error: {0}")]
    HttpBuilderError(String),
}

impl VideoStream {
    pub fn new(source: Arc<dyn FrameSource>, video_stream_delay: u64, jpeg_quality: u8) -> Self {
        Self {
            source,
            video_stream_delay,
            jpeg_quality,
        }
    }

    fn next_part(&self) -> Result<Bytes, VideoStreamError> {
        let jpeg = self.source.acquire()?.to_jpeg(self.jpeg_quality)?;
        let part_header = format!(
            "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            FRAME_BOUNDARY,
            jpeg.len()
        );
        let mut body = part_header.into_bytes();
        body.extend_from_slice(&jpeg);
        body.extend_from_slice(b"\r\n");
        Ok(Bytes::from(body))
    }

    /// Ends on the first camera failure; the viewer reconnects to retry.
    #[instrument(skip(self))]
    pub fn generate_stream(self) -> impl futures::Stream<Item = Result<Bytes, VideoStreamError>> {
        stream::unfold(Some(self), |state| async move {
            let stream = state?;
            sleep(Duration::from_millis(stream.video_stream_delay)).await;
            match stream.next_part() {
                Ok(part) => Some((Ok(part), Some(stream))),
                Err(e) => {
                    tracing::error!("Error getting frame: {:?}", e);
                    Some((Err(e), None))
                }
            }
        })
    }
}
