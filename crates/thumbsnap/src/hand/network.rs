//! Hand landmark estimation with an ONNX network.
//!
//! Expects a network with the MediaPipe hand landmark output layout:
//!
//! 1. screen landmarks, 21 × (x, y, z) in input pixel coordinates
//! 2. hand presence flag
//! 3. handedness
//! 4. (optional) metric landmarks, ignored
//!
//! The network sees the whole camera frame stretched to its input resolution, so it works best
//! when the hand fills a good part of the picture. There is no palm detection stage, which limits
//! the result to at most one hand per frame.

use std::path::Path;

use anyhow::{bail, Context};
use itertools::Itertools;
use tract_onnx::prelude::{
    tract_ndarray::Array4, tvec, Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan,
    Tensor, TypedFact, TypedOp,
};

use crate::image::{Color, Image, Resolution};

use super::landmark::{HandPose, Handedness, Position};
use super::HandDetector;

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Memory layout of the network's input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputLayout {
    /// `[1, 3, H, W]`
    Nchw,
    /// `[1, H, W, 3]`
    Nhwc,
}

/// A loaded hand landmark network.
pub struct LandmarkNetwork {
    model: Model,
    layout: InputLayout,
    input_res: Resolution,
    min_presence: f32,
}

impl LandmarkNetwork {
    /// Loads and optimizes a network from an `.onnx` file.
    ///
    /// Hands with a presence score below `min_presence` are discarded.
    pub fn load<P: AsRef<Path>>(path: P, min_presence: f32) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref(), min_presence)
    }

    fn load_impl(path: &Path, min_presence: f32) -> anyhow::Result<Self> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!(
                "neural network file '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        let graph = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to load '{}'", path.display()))?
            .into_optimized()?;

        if graph.inputs.len() != 1 {
            bail!(
                "hand landmark network has to take exactly 1 input, this one takes {}",
                graph.inputs.len(),
            );
        }
        if graph.outputs.len() < 3 {
            bail!(
                "hand landmark network needs at least 3 outputs, this one has {}",
                graph.outputs.len(),
            );
        }

        let fact = graph.input_fact(0)?;
        let shape = fact
            .shape
            .as_concrete()
            .context("hand landmark network has a symbolic input shape")?;
        let (layout, w, h) = match *shape {
            [1, 3, h, w] => (InputLayout::Nchw, w, h),
            [1, h, w, 3] => (InputLayout::Nhwc, w, h),
            _ => bail!("unsupported hand landmark network input shape {:?}", shape),
        };
        let input_res = Resolution::new(w.try_into()?, h.try_into()?);

        let model = SimplePlan::new(graph)?;

        log::info!(
            "loaded hand landmark network '{}' ({:?}, {})",
            path.display(),
            layout,
            input_res,
        );

        Ok(Self {
            model,
            layout,
            input_res,
            min_presence,
        })
    }

    /// Returns the resolution camera frames are resampled to.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network on `frame`.
    ///
    /// Returns [`None`] if the network is not confident that a hand is present.
    pub fn estimate(&self, frame: &Image) -> anyhow::Result<Option<HandPose>> {
        if frame.width() == 0 || frame.height() == 0 {
            bail!("cannot run hand landmark network on empty frame");
        }

        let (w, h) = (
            self.input_res.width() as usize,
            self.input_res.height() as usize,
        );
        let input = match self.layout {
            InputLayout::Nchw => Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
                channel(sample(frame, self.input_res, x, y), c)
            }),
            InputLayout::Nhwc => Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| {
                channel(sample(frame, self.input_res, x, y), c)
            }),
        };

        let outputs = self.model.run(tvec![input.into_tensor().into()])?;

        let screen = outputs[0].to_array_view::<f32>()?;
        let presence = scalar(&outputs[1], "hand presence")?;
        let handedness = scalar(&outputs[2], "handedness")?;

        if screen.len() != HandPose::NUM_LANDMARKS * 3 {
            bail!(
                "expected {} landmark coordinates, network produced {}",
                HandPose::NUM_LANDMARKS * 3,
                screen.len(),
            );
        }

        if presence < self.min_presence {
            log::trace!("hand presence {presence:.2} below threshold");
            return Ok(None);
        }

        // Network outputs are in input pixels; the input covers the whole frame, so dividing by
        // the input size normalizes to frame coordinates.
        let (w, h) = (w as f32, h as f32);
        let positions = screen
            .iter()
            .copied()
            .tuples::<(_, _, _)>()
            .map(|(x, y, z)| -> Position { [x / w, y / h, z / w] })
            .collect::<Vec<_>>();

        let handedness = if handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        };

        Ok(Some(
            HandPose::new(positions)
                .with_presence(presence)
                .with_handedness(handedness),
        ))
    }
}

impl HandDetector for LandmarkNetwork {
    fn detect(&mut self, frame: &Image) -> anyhow::Result<Vec<HandPose>> {
        Ok(self.estimate(frame)?.into_iter().collect())
    }
}

/// Nearest-neighbor sample of the frame pixel under network input pixel `(x, y)`.
fn sample(frame: &Image, input_res: Resolution, x: usize, y: usize) -> Color {
    let map = |pos: usize, input_len: u32, frame_len: u32| {
        let scaled = (pos as f32 + 0.5) / input_len as f32 * frame_len as f32;
        (scaled as u32).min(frame_len - 1)
    };
    frame.get(
        map(x, input_res.width(), frame.width()),
        map(y, input_res.height(), frame.height()),
    )
}

/// Maps an sRGB channel to the `0.0..=1.0` range the network expects.
fn channel(color: Color, c: usize) -> f32 {
    let value = match c {
        0 => color.r(),
        1 => color.g(),
        _ => color.b(),
    };
    f32::from(value) / 255.0
}

fn scalar(tensor: &Tensor, name: &str) -> anyhow::Result<f32> {
    let view = tensor.to_array_view::<f32>()?;
    let value = view.iter().next().copied();
    value.with_context(|| format!("{name} output is empty"))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn sampling_covers_frame() {
        let mut frame = Image::new(4, 2);
        frame.set(1, 0, Color::RED);
        frame.set(3, 1, Color::BLUE);

        let input = Resolution::new(2, 2);
        assert_eq!(sample(&frame, input, 0, 0), Color::RED);
        assert_eq!(sample(&frame, input, 1, 1), Color::BLUE);

        // Upsampling never reads out of bounds.
        let input = Resolution::new(9, 7);
        assert_eq!(sample(&frame, input, 8, 6), Color::BLUE);
    }

    #[test]
    fn channel_range() {
        let color = Color::from_rgb8(0, 255, 51);
        assert_eq!(channel(color, 0), 0.0);
        assert_eq!(channel(color, 1), 1.0);
        assert_relative_eq!(channel(color, 2), 0.2);
    }

    #[test]
    fn rejects_non_onnx_path() {
        let err = LandmarkNetwork::load("hand_landmark.tflite", 0.5)
            .err()
            .expect("loading a .tflite file should fail");
        assert!(err.to_string().contains(".onnx"), "{err}");
    }
}
