use base64::{engine::general_purpose::STANDARD, Engine};
use image::{codecs::jpeg::JpegEncoder, RgbImage};
use std::time::SystemTime;
use thiserror::Error;

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to encode frame: {0}")]
    EncodeFailed(#[from] image::ImageError),
    #[error("Pixel buffer does not match {width}x{height}")]
    BufferSize { width: u32, height: u32 },
}

/// One still image taken from the camera feed.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: RgbImage,
    pub captured_at: SystemTime,
}

impl Frame {
    pub fn new(pixels: RgbImage) -> Self {
        Self {
            pixels,
            captured_at: SystemTime::now(),
        }
    }

    pub fn from_rgb_bytes(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self, FrameError> {
        let pixels = RgbImage::from_raw(width, height, bytes)
            .ok_or(FrameError::BufferSize { width, height })?;
        Ok(Self::new(pixels))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, FrameError> {
        encode_jpeg(&self.pixels, quality)
    }

    pub fn to_data_url(&self, quality: u8) -> Result<String, FrameError> {
        Ok(jpeg_data_url(&self.to_jpeg(quality)?))
    }
}

pub fn encode_jpeg(pixels: &RgbImage, quality: u8) -> Result<Vec<u8>, FrameError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(pixels)?;
    Ok(buffer)
}

pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(jpeg))
}
