//! Hand poses as reported by the landmark network.

use itertools::Itertools;

use crate::image::{draw, Color, Image};

/// A landmark position: X and Y normalized to the frame size (Y pointing down), Z is depth
/// relative to the wrist.
pub type Position = [f32; 3];

/// The landmarks of one detected hand.
///
/// A complete pose holds [`HandPose::NUM_LANDMARKS`] positions, indexed by [`LandmarkIdx`].
/// Detector output is not trusted to be complete, so shorter poses can be constructed; consumers
/// like [`classify`][crate::hand::gesture::classify] reject them.
#[derive(Debug, Clone, PartialEq)]
pub struct HandPose {
    positions: Box<[Position]>,
    presence: Option<f32>,
    handedness: Option<Handedness>,
}

impl HandPose {
    /// Number of landmarks in a complete hand pose.
    pub const NUM_LANDMARKS: usize = 21;

    pub fn new(positions: impl Into<Box<[Position]>>) -> Self {
        Self {
            positions: positions.into(),
            presence: None,
            handedness: None,
        }
    }

    /// Attaches the network's hand presence score.
    pub fn with_presence(self, presence: f32) -> Self {
        Self {
            presence: Some(presence),
            ..self
        }
    }

    pub fn with_handedness(self, handedness: Handedness) -> Self {
        Self {
            handedness: Some(handedness),
            ..self
        }
    }

    /// Returns the number of landmarks in this pose.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns a landmark's position, or [`None`] if the detector did not report it.
    pub fn landmark(&self, idx: LandmarkIdx) -> Option<Position> {
        self.positions.get(idx as usize).copied()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn presence(&self) -> Option<f32> {
        self.presence
    }

    pub fn handedness(&self) -> Option<Handedness> {
        self.handedness
    }

    /// Draws the hand skeleton onto `target`.
    ///
    /// Landmarks are scaled by `target`'s resolution, so this expects the frame the pose was
    /// detected in. Missing landmarks are skipped.
    pub fn draw(&self, target: &mut Image) {
        let (w, h) = (target.width() as f32, target.height() as f32);
        let to_px = |idx: LandmarkIdx| {
            self.landmark(idx)
                .map(|[x, y, _]| ((x * w).round() as i32, (y * h).round() as i32))
        };

        let palm_edges = PALM.iter().circular_tuple_windows::<(_, _)>();
        let finger_edges = FINGERS
            .iter()
            .flat_map(|finger| finger.iter().tuple_windows::<(_, _)>());
        for (&a, &b) in palm_edges.chain(finger_edges) {
            if let (Some(a), Some(b)) = (to_px(a), to_px(b)) {
                draw::line(target, a.0, a.1, b.0, b.1).color(Color::GREEN);
            }
        }

        for &[x, y, _] in self.positions.iter() {
            draw::marker(target, (x * w).round() as i32, (y * h).round() as i32);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the knuckle joining a finger to the palm.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **IP**: The thumb's single Interphalangeal joint, between its MCP and tip.
/// - **Tip**: This landmark is just placed on the tip of the finger.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

const PALM: &[LandmarkIdx] = {
    use LandmarkIdx::*;
    &[
        Wrist,
        ThumbCmc,
        IndexFingerMcp,
        MiddleFingerMcp,
        RingFingerMcp,
        PinkyMcp,
    ]
};

const FINGERS: &[&[LandmarkIdx]] = {
    use LandmarkIdx::*;
    &[
        &[ThumbCmc, ThumbMcp, ThumbIp, ThumbTip],
        &[IndexFingerMcp, IndexFingerPip, IndexFingerDip, IndexFingerTip],
        &[MiddleFingerMcp, MiddleFingerPip, MiddleFingerDip, MiddleFingerTip],
        &[RingFingerMcp, RingFingerPip, RingFingerDip, RingFingerTip],
        &[PinkyMcp, PinkyPip, PinkyDip, PinkyTip],
    ]
};
