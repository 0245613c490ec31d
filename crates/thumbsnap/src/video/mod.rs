//! Camera frame sources.

pub mod webcam;

use crate::image::Image;

/// Produces camera frames for the frame loop.
pub trait FrameSource {
    /// Blocks until the next frame is available and returns it.
    ///
    /// An error means the camera is gone and the loop can not continue.
    fn read(&mut self) -> anyhow::Result<Image>;
}
