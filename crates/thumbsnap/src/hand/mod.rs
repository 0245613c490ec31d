//! Hand landmarks and gesture recognition.

pub mod gesture;
pub mod landmark;
pub mod network;

use crate::image::Image;

use self::landmark::HandPose;

/// Finds hands in camera frames.
pub trait HandDetector {
    /// Returns the landmarks of every hand visible in `frame`, in detection order.
    ///
    /// Returning an empty list is the normal "no hands" case. An error means that detection itself
    /// failed for this frame.
    fn detect(&mut self, frame: &Image) -> anyhow::Result<Vec<HandPose>>;
}
