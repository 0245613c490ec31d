//! Hands-free selfie camera.
//!
//! `thumbsnap` watches a webcam feed for a "thumbs up" hand pose. When one is seen, it plays a
//! confirmation beep, counts down for a few seconds, then saves the current frame to disk and plays
//! a shutter sound. A short cooldown afterwards keeps the same gesture from immediately triggering
//! another capture.
//!
//! The pipeline is split into three layers:
//!
//! - [`hand::gesture`] decides whether a single hand's landmarks form the gesture.
//! - [`capture`] turns the per-frame yes/no signal into a debounced capture with countdown and
//!   cooldown.
//! - [`driver`] runs the frame loop and talks to the camera, landmark network, preview window,
//!   speakers and disk through small traits.
//!
//! # Coordinates
//!
//! Landmark coordinates follow the landmark network's convention: X and Y are normalized to the
//! frame's width and height, with Y pointing *down*. A smaller Y value is higher up in the image.
//!
//! # Environment Variables
//!
//! All settings in [`config::Config`] can be overridden with `THUMBSNAP_*` environment variables,
//! see [`config`] for the full list. `RUST_LOG` is honored by [`init_logger!`].

use log::LevelFilter;

pub mod audio;
pub mod capture;
pub mod config;
pub mod driver;
pub mod gui;
pub mod hand;
pub mod image;
pub mod persist;
pub mod timer;
pub mod video;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and `thumbsnap` log at *debug* level, the ONNX runtime at *warn* level.
/// `RUST_LOG` is applied on top of these defaults.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
