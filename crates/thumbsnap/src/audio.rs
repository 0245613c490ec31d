//! Sound cues.

use std::{fmt, fs, io::Cursor, path::Path};

use anyhow::Context;
use rodio::{source::Buffered, Decoder, OutputStream, OutputStreamHandle, Source};

/// The sounds played by the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// The gesture was recognized and the countdown started.
    Confirm,
    /// The picture was taken.
    Shutter,
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cue::Confirm => "confirm",
            Cue::Shutter => "shutter",
        })
    }
}

/// Plays [`Cue`]s without blocking the caller.
///
/// Playback failures are not reported to the caller; implementations log them instead.
pub trait CuePlayer {
    fn play(&mut self, cue: Cue);
}

type Clip = Buffered<Decoder<Cursor<Vec<u8>>>>;

/// Plays cues on the default audio output device.
///
/// Both clips are decoded once when the speaker is opened. Playing a cue mixes it into the output
/// stream, which `rodio` drives from its own thread.
pub struct Speaker {
    // Must outlive `handle`, dropping it stops all playback.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    confirm: Clip,
    shutter: Clip,
}

impl Speaker {
    /// Opens the default output device and loads the two cue files.
    pub fn open(confirm: impl AsRef<Path>, shutter: impl AsRef<Path>) -> anyhow::Result<Self> {
        let confirm = load_clip(confirm.as_ref())?;
        let shutter = load_clip(shutter.as_ref())?;
        let (stream, handle) =
            OutputStream::try_default().context("failed to open audio output device")?;
        Ok(Self {
            _stream: stream,
            handle,
            confirm,
            shutter,
        })
    }
}

impl CuePlayer for Speaker {
    fn play(&mut self, cue: Cue) {
        let clip = match cue {
            Cue::Confirm => self.confirm.clone(),
            Cue::Shutter => self.shutter.clone(),
        };
        if let Err(e) = self.handle.play_raw(clip.convert_samples()) {
            log::warn!("failed to play {cue} cue: {e}");
        }
    }
}

fn load_clip(path: &Path) -> anyhow::Result<Clip> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read sound file '{}'", path.display()))?;
    decode_clip(bytes).with_context(|| format!("failed to decode '{}'", path.display()))
}

fn decode_clip(bytes: Vec<u8>) -> anyhow::Result<Clip> {
    let decoder = Decoder::new(Cursor::new(bytes))?;
    log::debug!(
        "decoded sound: {} channel(s) at {} Hz",
        decoder.channels(),
        decoder.sample_rate(),
    );
    Ok(decoder.buffered())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a mono 16-bit PCM WAV file.
    fn wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // channels
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    #[test]
    fn decodes_wav() {
        let clip = decode_clip(wav(8000, &[0, 1000, -1000, 0])).unwrap();
        assert_eq!(clip.channels(), 1);
        assert_eq!(clip.sample_rate(), 8000);

        // Every playback gets the whole clip.
        assert_eq!(clip.clone().count(), 4);
        assert_eq!(clip.count(), 4);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_clip(b"definitely not a sound".to_vec()).is_err());
    }

    #[test]
    fn missing_file_is_named() {
        let err = load_clip(Path::new("/nonexistent/beep.wav")).err().unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/beep.wav"), "{err:#}");
    }

    #[test]
    fn cue_names() {
        assert_eq!(Cue::Confirm.to_string(), "confirm");
        assert_eq!(Cue::Shutter.to_string(), "shutter");
    }
}
