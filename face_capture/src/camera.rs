use crate::config::CameraConfig;
use crate::frame::{Frame, FrameError};
use std::{path::Path, sync::Arc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Failed to read frame: {0}")]
    ReadFrameFailed(String),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

#[cfg(feature = "camera-opencv")]
impl From<opencv::Error> for CameraError {
    fn from(err: opencv::Error) -> Self {
        CameraError::ReadFrameFailed(err.to_string())
    }
}

/// Anything that can hand out the current camera frame. Reads never
/// disturb the underlying stream, so callers may acquire repeatedly.
pub trait FrameSource: Send + Sync + 'static {
    fn acquire(&self) -> Result<Frame, CameraError>;
}

/// Serves the same decoded image on every acquire.
#[derive(Debug)]
pub struct StillImageSource {
    frame: Frame,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, CameraError> {
        let image = image::open(path).map_err(|e| {
            CameraError::DeviceUnavailable(format!("cannot load {}: {}", path.display(), e))
        })?;
        Ok(Self {
            frame: Frame::new(image.to_rgb8()),
        })
    }
}

impl FrameSource for StillImageSource {
    fn acquire(&self) -> Result<Frame, CameraError> {
        Ok(Frame::new(self.frame.pixels.clone()))
    }
}

/// Opens the frame source the configuration asks for. Called once at startup;
/// the returned handle is shared by every capture.
pub fn start(config: &CameraConfig) -> Result<Arc<dyn FrameSource>, CameraError> {
    if let Some(path) = &config.still_image {
        tracing::info!("Serving still image {} as camera", path.display());
        return Ok(Arc::new(StillImageSource::open(path)?));
    }
    start_device(config)
}

#[cfg(feature = "camera-opencv")]
fn start_device(config: &CameraConfig) -> Result<Arc<dyn FrameSource>, CameraError> {
    Ok(Arc::new(device::Camera::start(config)?))
}

#[cfg(not(feature = "camera-opencv"))]
fn start_device(_config: &CameraConfig) -> Result<Arc<dyn FrameSource>, CameraError> {
    Err(CameraError::DeviceUnavailable(
        "built without the `camera-opencv` feature and no still_image configured".to_string(),
    ))
}

#[cfg(feature = "camera-opencv")]
mod device {
    use super::{CameraError, FrameSource};
    use crate::{config::CameraConfig, frame::Frame};
    use opencv::{core::Mat, imgproc, prelude::*, videoio};
    use parking_lot::Mutex;

    pub struct Camera {
        capture: Mutex<videoio::VideoCapture>,
    }

    impl Camera {
        pub fn start(config: &CameraConfig) -> Result<Self, CameraError> {
            check_device_access(config.device_index)?;

            let mut capture = videoio::VideoCapture::new(config.device_index, videoio::CAP_ANY)
                .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;
            if !capture.is_opened()? {
                return Err(CameraError::DeviceUnavailable(format!(
                    "device {} could not be opened",
                    config.device_index
                )));
            }

            // The device may grant a different mode; whatever it picks wins.
            capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.ideal_width as f64)?;
            capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.ideal_height as f64)?;
            let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)?;
            let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?;
            tracing::info!(
                "Camera {} streaming at {}x{} (requested {}x{})",
                config.device_index,
                width,
                height,
                config.ideal_width,
                config.ideal_height
            );

            Ok(Self {
                capture: Mutex::new(capture),
            })
        }
    }

    impl FrameSource for Camera {
        fn acquire(&self) -> Result<Frame, CameraError> {
            let mut bgr = Mat::default();
            let grabbed = {
                let mut cam = self.capture.lock();
                cam.read(&mut bgr)
                    .map_err(|e| CameraError::ReadFrameFailed(e.to_string()))?
            };
            if !grabbed || bgr.empty() {
                return Err(CameraError::DeviceUnavailable(
                    "camera stream returned no frame".to_string(),
                ));
            }

            let mut rgb = Mat::default();
            imgproc::cvt_color_def(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB)?;
            let width = rgb.cols() as u32;
            let height = rgb.rows() as u32;
            let bytes = rgb.data_bytes()?.to_vec();

            Ok(Frame::from_rgb_bytes(width, height, bytes)?)
        }
    }

    #[cfg(target_os = "linux")]
    fn check_device_access(index: i32) -> Result<(), CameraError> {
        use std::io::ErrorKind;

        let path = format!("/dev/video{}", index);
        match std::fs::OpenOptions::new().read(true).open(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(CameraError::PermissionDenied(path))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CameraError::DeviceUnavailable(path)),
            // Busy or odd nodes are left for OpenCV to judge.
            Err(_) => Ok(()),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn check_device_access(_index: i32) -> Result<(), CameraError> {
        Ok(())
    }
}
