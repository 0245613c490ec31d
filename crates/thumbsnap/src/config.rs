//! Runtime settings.
//!
//! Every field of [`Config`] has a default and can be overridden with an environment variable:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `THUMBSNAP_CONFIRM_DELAY` | `3` | Seconds between recognizing the gesture and the capture. |
//! | `THUMBSNAP_COOLDOWN` | `1` | Seconds after a capture during which the gesture is ignored. |
//! | `THUMBSNAP_ARMING` | `committed` | `committed` or `continuous`, see [`ArmingPolicy`]. |
//! | `THUMBSNAP_WEBCAM_NAME` | any | Only open the V4L2 device with this card name. |
//! | `THUMBSNAP_WEBCAM_RESOLUTION` | any | Minimum resolution to request, like `1280x720`. |
//! | `THUMBSNAP_WEBCAM_FPS` | `30` | Frame rate to request. |
//! | `THUMBSNAP_MIRROR` | `true` | Flip frames horizontally, like a mirror. |
//! | `THUMBSNAP_MIN_PRESENCE` | `0.7` | Hand presence score a detection needs to count. |
//! | `THUMBSNAP_MODEL` | `hand_landmark_lite.onnx` | Hand landmark network. |
//! | `THUMBSNAP_OUTPUT_DIR` | `.` | Directory snapshots are written to. |
//! | `THUMBSNAP_CLEAN_SNAPSHOTS` | `false` | Save the raw frame instead of the annotated preview. |
//! | `THUMBSNAP_CONFIRM_CUE` | `beep.wav` | Sound played when the gesture is recognized. |
//! | `THUMBSNAP_SHUTTER_CUE` | `shutter.wav` | Sound played when the picture is taken. |

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context};

use crate::capture::{ArmingPolicy, Timing};
use crate::image::Resolution;

const PREFIX: &str = "THUMBSNAP_";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub timing: Timing,
    pub webcam_name: Option<String>,
    pub webcam_resolution: Option<Resolution>,
    pub webcam_fps: u32,
    pub mirror: bool,
    pub min_presence: f32,
    pub model_path: PathBuf,
    pub output_dir: PathBuf,
    pub clean_snapshots: bool,
    pub confirm_cue: PathBuf,
    pub shutter_cue: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            webcam_name: None,
            webcam_resolution: None,
            webcam_fps: 30,
            mirror: true,
            min_presence: 0.7,
            model_path: "hand_landmark_lite.onnx".into(),
            output_dir: ".".into(),
            clean_snapshots: false,
            confirm_cue: "beep.wav".into(),
            shutter_cue: "shutter.wav".into(),
        }
    }
}

impl Config {
    /// Builds a [`Config`] from the defaults and the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a [`Config`] from the defaults, overriding every setting `lookup` returns a value
    /// for.
    ///
    /// `lookup` is called with the full variable name, including the `THUMBSNAP_` prefix.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let vars = Vars { lookup };
        let mut config = Self::default();

        if let Some(secs) = vars.parse("CONFIRM_DELAY", seconds)? {
            config.timing.confirm_delay = secs;
        }
        if let Some(secs) = vars.parse("COOLDOWN", seconds)? {
            config.timing.cooldown = secs;
        }
        if let Some(arming) = vars.parse("ARMING", arming_policy)? {
            config.timing.arming = arming;
        }

        if let Some(name) = vars.get("WEBCAM_NAME") {
            config.webcam_name = Some(name);
        }
        if let Some(res) = vars.parse("WEBCAM_RESOLUTION", resolution)? {
            config.webcam_resolution = Some(res);
        }
        if let Some(fps) = vars.parse("WEBCAM_FPS", u32::from_str)? {
            if fps == 0 {
                bail!("{PREFIX}WEBCAM_FPS must be at least 1");
            }
            config.webcam_fps = fps;
        }
        if let Some(mirror) = vars.parse("MIRROR", flag)? {
            config.mirror = mirror;
        }

        if let Some(presence) = vars.parse("MIN_PRESENCE", f32::from_str)? {
            if !(0.0..=1.0).contains(&presence) {
                bail!("{PREFIX}MIN_PRESENCE must be between 0 and 1, got {presence}");
            }
            config.min_presence = presence;
        }

        if let Some(path) = vars.get("MODEL") {
            config.model_path = path.into();
        }
        if let Some(path) = vars.get("OUTPUT_DIR") {
            config.output_dir = path.into();
        }
        if let Some(clean) = vars.parse("CLEAN_SNAPSHOTS", flag)? {
            config.clean_snapshots = clean;
        }
        if let Some(path) = vars.get("CONFIRM_CUE") {
            config.confirm_cue = path.into();
        }
        if let Some(path) = vars.get("SHUTTER_CUE") {
            config.shutter_cue = path.into();
        }

        Ok(config)
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, name: &str) -> Option<String> {
        let var = format!("{PREFIX}{name}");
        let value = (self.lookup)(&var)?;
        log::debug!("config override: `{var}` is set to '{value}'");
        Some(value)
    }

    fn parse<T, E>(
        &self,
        name: &str,
        parse: impl Fn(&str) -> Result<T, E>,
    ) -> anyhow::Result<Option<T>>
    where
        E: Into<anyhow::Error>,
    {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        parse(value.trim())
            .map(Some)
            .map_err(Into::<anyhow::Error>::into)
            .with_context(|| format!("invalid value '{value}' for `{PREFIX}{name}`"))
    }
}

fn seconds(s: &str) -> anyhow::Result<Duration> {
    let secs = f64::from_str(s)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow!("expected a non-negative number of seconds"))
}

fn arming_policy(s: &str) -> anyhow::Result<ArmingPolicy> {
    match s.to_ascii_lowercase().as_str() {
        "committed" => Ok(ArmingPolicy::Committed),
        "continuous" => Ok(ArmingPolicy::Continuous),
        _ => bail!("expected `committed` or `continuous`"),
    }
}

fn resolution(s: &str) -> anyhow::Result<Resolution> {
    let (w, h) = s
        .split_once(|c| c == 'x' || c == 'X')
        .context("expected a resolution like `1280x720`")?;
    let (w, h) = (w.trim().parse::<u32>()?, h.trim().parse::<u32>()?);
    if w == 0 || h == 0 {
        bail!("resolution must not be empty");
    }
    Ok(Resolution::new(w, h))
}

fn flag(s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected a boolean like `true` or `false`"),
    }
}
