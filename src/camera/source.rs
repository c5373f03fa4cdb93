use std::sync::Arc;

use anyhow::Result;

use crate::settings::CameraSettings;

use super::frame::Frame;

/// Produces the most recent decoded frame on demand, no queuing.
///
/// Sources live on the acquisition thread that opened them, so they need not
/// be `Send`.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame>;
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// The build has no device backend at all.
    #[error("camera support not compiled in")]
    Unsupported,
    #[error("failed to open camera: {0:#}")]
    Failed(anyhow::Error),
}

/// Opens the physical device. Called on the acquisition thread.
pub type DeviceOpener =
    Arc<dyn Fn(&CameraSettings) -> Result<Box<dyn FrameSource>, OpenError> + Send + Sync>;

pub fn device_support() -> bool {
    cfg!(feature = "device")
}

pub fn default_opener() -> DeviceOpener {
    Arc::new(open_device)
}

#[cfg(feature = "device")]
fn open_device(settings: &CameraSettings) -> Result<Box<dyn FrameSource>, OpenError> {
    device::DeviceSource::open(settings)
        .map(|source| Box::new(source) as Box<dyn FrameSource>)
        .map_err(OpenError::Failed)
}

#[cfg(not(feature = "device"))]
fn open_device(_settings: &CameraSettings) -> Result<Box<dyn FrameSource>, OpenError> {
    Err(OpenError::Unsupported)
}

#[cfg(feature = "device")]
mod device {
    use anyhow::{anyhow, Context, Result};
    use image::RgbImage;
    use log::{info, warn};
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    };
    use nokhwa::Camera;

    use super::FrameSource;
    use crate::camera::frame::Frame;
    use crate::settings::CameraSettings;

    pub struct DeviceSource {
        camera: Camera,
    }

    impl DeviceSource {
        pub fn open(settings: &CameraSettings) -> Result<Self> {
            let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new(
                    Resolution::new(settings.width, settings.height),
                    FrameFormat::MJPEG,
                    settings.fps,
                ),
            ));

            let mut camera = Camera::new(CameraIndex::Index(settings.index), requested)
                .with_context(|| format!("camera {} is not available", settings.index))?;
            camera
                .open_stream()
                .context("failed to start camera stream")?;

            let resolution = camera.resolution();
            info!(
                "Camera {} opened at {}x{} @ {} fps",
                settings.index,
                resolution.width(),
                resolution.height(),
                camera.frame_rate()
            );

            Ok(Self { camera })
        }
    }

    impl FrameSource for DeviceSource {
        fn read_frame(&mut self) -> Result<Frame> {
            let buffer = self.camera.frame().context("failed to read frame")?;
            let decoded = buffer
                .decode_image::<RgbFormat>()
                .context("failed to decode frame")?;
            let (width, height) = (decoded.width(), decoded.height());
            let image = RgbImage::from_raw(width, height, decoded.into_raw())
                .ok_or_else(|| anyhow!("decoded frame has unexpected size"))?;
            Ok(Frame::new(image))
        }
    }

    impl Drop for DeviceSource {
        fn drop(&mut self) {
            if let Err(err) = self.camera.stop_stream() {
                warn!("Failed to release camera: {err}");
            }
        }
    }
}
