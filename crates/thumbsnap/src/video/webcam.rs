//! V4L2 webcam access.
//!
//! Only `VIDEO_CAPTURE` devices that deliver JPEG or Motion JPEG frames are supported, which
//! covers almost every USB webcam.

use anyhow::bail;
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, Pixelformat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::image::{Image, Resolution};

use super::FrameSource;

/// Device selection and format negotiation options.
#[derive(Debug, Clone, Default)]
pub struct WebcamOptions {
    name: Option<String>,
    prefs: Prefs,
    mirror: bool,
}

impl WebcamOptions {
    /// Only opens the device whose card name is `name`.
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Requests at least this resolution.
    ///
    /// If the webcam has no such mode, any resolution is accepted.
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.prefs.resolution = Some(resolution);
        self
    }

    /// Requests at least this frame rate.
    ///
    /// The frame rate is given up before the resolution if the webcam can't deliver both.
    pub fn fps(mut self, fps: u32) -> Self {
        self.prefs.fps = Some(fps);
        self
    }

    /// Flips every frame horizontally, so the preview behaves like a mirror.
    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Prefs {
    resolution: Option<Resolution>,
    fps: Option<u32>,
}

/// A resolution and frame rate the webcam offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mode {
    resolution: Resolution,
    fps: u32,
}

/// Picks the mode best matching `prefs`, relaxing the frame rate and then the resolution
/// requirement until some mode qualifies.
///
/// Among qualifying modes, the one with the most pixels wins, then the one with the highest frame
/// rate. Returns the index into `modes`.
fn pick_mode(modes: &[Mode], mut prefs: Prefs) -> Option<usize> {
    loop {
        let best = modes
            .iter()
            .enumerate()
            .filter(|(_, mode)| {
                prefs.resolution.map_or(true, |res| {
                    mode.resolution.width() >= res.width()
                        && mode.resolution.height() >= res.height()
                }) && prefs.fps.map_or(true, |fps| mode.fps >= fps)
            })
            .max_by_key(|(_, mode)| (mode.resolution.num_pixels(), mode.fps))
            .map(|(i, _)| i);
        if best.is_some() {
            return best;
        }

        log::debug!("no webcam mode satisfies {:?}", prefs);
        if prefs.fps.take().is_none() && prefs.resolution.take().is_none() {
            return None;
        }
    }
}

/// Lists the JPEG modes of `device` and picks one.
fn negotiate(device: &Device, prefs: Prefs) -> anyhow::Result<(PixFormat, Fract)> {
    let mut pixel_format = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?.pixelformat();
        if format == Pixelformat::JPEG || format == Pixelformat::MJPG {
            pixel_format = Some(format);
            break;
        }
    }
    let Some(pixel_format) = pixel_format else {
        bail!("device does not offer JPEG or MJPG frames");
    };

    let sizes = match device.frame_sizes(pixel_format)? {
        FrameSizes::Discrete(sizes) => sizes,
        FrameSizes::Stepwise(_) | FrameSizes::Continuous(_) => {
            bail!("stepwise or continuous frame sizes are not supported");
        }
    };

    let mut modes = Vec::new();
    let mut intervals = Vec::new();
    for size in sizes {
        let rates = match device.frame_intervals(pixel_format, size.width(), size.height())? {
            FrameIntervals::Discrete(rates) => rates,
            FrameIntervals::Stepwise(_) | FrameIntervals::Continuous(_) => {
                bail!("stepwise or continuous frame intervals are not supported");
            }
        };
        for rate in rates {
            let interval = *rate.fract();
            modes.push(Mode {
                resolution: Resolution::new(size.width(), size.height()),
                fps: (1.0 / interval.as_f32()).round() as u32,
            });
            intervals.push(interval);
        }
    }

    let Some(i) = pick_mode(&modes, prefs) else {
        bail!("device offers no usable frame size");
    };
    let res = modes[i].resolution;
    Ok((
        PixFormat::new(res.width(), res.height(), pixel_format),
        intervals[i],
    ))
}

/// A webcam yielding a stream of [`Image`]s.
pub struct Webcam {
    stream: ReadStream,
    resolution: Resolution,
    mirror: bool,
}

impl Webcam {
    /// Opens the first matching webcam.
    ///
    /// This can block for a few hundred milliseconds while the camera powers up.
    pub fn open(options: WebcamOptions) -> anyhow::Result<Self> {
        for device in linuxvideo::list()? {
            match device {
                Ok(device) => match Self::open_device(device, &options) {
                    Ok(Some(webcam)) => return Ok(webcam),
                    Ok(None) => {}
                    Err(e) => log::debug!("skipping device: {e}"),
                },
                Err(e) => log::warn!("{e}"),
            }
        }

        match &options.name {
            Some(name) => bail!("no supported webcam named '{name}' found"),
            None => bail!("no supported webcam found"),
        }
    }

    fn open_device(device: Device, options: &WebcamOptions) -> anyhow::Result<Option<Self>> {
        let caps = device.capabilities()?;
        if let Some(name) = &options.name {
            if caps.card() != name {
                return Ok(None);
            }
        }

        let flags = caps.device_capabilities();
        let path = device.path()?;
        log::debug!("{} ({}): {:?}", caps.card(), path.display(), flags);
        if !flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            return Ok(None);
        }

        let (format, interval) = negotiate(&device, options.prefs)?;
        let capture = device.video_capture(format)?;
        let format = capture.format();
        let resolution = Resolution::new(format.width(), format.height());
        let actual = capture.set_frame_interval(interval)?;

        log::info!(
            "opened {} ({}), {} @ {:.1}Hz",
            caps.card(),
            path.display(),
            resolution,
            1.0 / actual.as_f32(),
        );

        Ok(Some(Self {
            stream: capture.into_stream(2)?,
            resolution,
            mirror: options.mirror,
        }))
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Waits for the next frame and decodes it.
    ///
    /// USB webcams occasionally deliver a corrupted JPEG. Those frames are logged and replaced
    /// with a blank image, so a single bad frame never stops the stream.
    pub fn read(&mut self) -> anyhow::Result<Image> {
        let resolution = self.resolution;
        let mut image = self.stream.dequeue(|buf| {
            let image = match Image::decode_jpeg(&buf) {
                Ok(image) => image,
                Err(e) => {
                    log::error!("webcam decode error: {e:#}");
                    Image::new(resolution.width(), resolution.height())
                }
            };
            Ok(image)
        })?;

        if self.mirror {
            image.flip_horizontal_in_place();
        }
        Ok(image)
    }
}

impl FrameSource for Webcam {
    fn read(&mut self) -> anyhow::Result<Image> {
        Webcam::read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(width: u32, height: u32, fps: u32) -> Mode {
        Mode {
            resolution: Resolution::new(width, height),
            fps,
        }
    }

    const MODES: &[Mode] = &[
        Mode {
            resolution: Resolution::new(640, 480),
            fps: 30,
        },
        Mode {
            resolution: Resolution::new(640, 480),
            fps: 60,
        },
        Mode {
            resolution: Resolution::new(1280, 720),
            fps: 30,
        },
        Mode {
            resolution: Resolution::new(1920, 1080),
            fps: 5,
        },
    ];

    fn pick(prefs: Prefs) -> Option<Mode> {
        pick_mode(MODES, prefs).map(|i| MODES[i])
    }

    #[test]
    fn largest_mode_without_prefs() {
        assert_eq!(pick(Prefs::default()), Some(mode(1920, 1080, 5)));
    }

    #[test]
    fn fps_limits_resolution() {
        let prefs = Prefs {
            resolution: None,
            fps: Some(30),
        };
        assert_eq!(pick(prefs), Some(mode(1280, 720, 30)));

        let prefs = Prefs {
            resolution: None,
            fps: Some(60),
        };
        assert_eq!(pick(prefs), Some(mode(640, 480, 60)));
    }

    #[test]
    fn fps_is_dropped_before_resolution() {
        let prefs = Prefs {
            resolution: Some(Resolution::RES_1080P),
            fps: Some(30),
        };
        assert_eq!(pick(prefs), Some(mode(1920, 1080, 5)));
    }

    #[test]
    fn unsatisfiable_prefs_fall_back() {
        let prefs = Prefs {
            resolution: Some(Resolution::new(4096, 2160)),
            fps: Some(120),
        };
        assert_eq!(pick(prefs), Some(mode(1920, 1080, 5)));
    }

    #[test]
    fn no_modes() {
        assert_eq!(pick_mode(&[], Prefs::default()), None);
    }
}
