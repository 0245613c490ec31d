//! Thumbs-up recognition.
//!
//! The classifier only looks at the vertical relationship between fingertips and their reference
//! joints, so it expects a roughly upright hand. It has no memory; temporal smoothing is left to
//! [`crate::capture`].

use thiserror::Error;

use super::landmark::{HandPose, LandmarkIdx};

/// A hand pose that [`classify`] cannot make a decision about.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ClassifyError {
    #[error("hand pose is missing landmark {0:?}")]
    MissingLandmark(LandmarkIdx),
    #[error("landmark {0:?} has a non-finite position")]
    NonFinite(LandmarkIdx),
    #[error("invalid frame height {0}")]
    InvalidFrameHeight(f32),
}

/// The four fingers that have to be folded, as `(tip, knuckle)` pairs.
const FOLDED: [(LandmarkIdx, LandmarkIdx); 4] = [
    (LandmarkIdx::IndexFingerTip, LandmarkIdx::IndexFingerMcp),
    (LandmarkIdx::MiddleFingerTip, LandmarkIdx::MiddleFingerMcp),
    (LandmarkIdx::RingFingerTip, LandmarkIdx::RingFingerMcp),
    (LandmarkIdx::PinkyTip, LandmarkIdx::PinkyMcp),
];

/// Decides whether `pose` shows a thumbs up.
///
/// That is the case when the thumb tip is strictly above the thumb's IP joint and every other
/// fingertip is strictly below its knuckle. Comparisons happen in pixel space, `frame_height`
/// being the height of the frame the pose was detected in.
///
/// All ten landmarks involved must be present and finite; anything else is an error rather than a
/// `false`, so a broken detection never silently looks like "no gesture".
pub fn classify(pose: &HandPose, frame_height: f32) -> Result<bool, ClassifyError> {
    if !(frame_height.is_finite() && frame_height > 0.0) {
        return Err(ClassifyError::InvalidFrameHeight(frame_height));
    }

    let pixel_y = |idx: LandmarkIdx| -> Result<f32, ClassifyError> {
        let [_, y, _] = pose
            .landmark(idx)
            .ok_or(ClassifyError::MissingLandmark(idx))?;
        if !y.is_finite() {
            return Err(ClassifyError::NonFinite(idx));
        }
        Ok(y * frame_height)
    };

    // Resolve every landmark before deciding, so that a malformed pose is reported even when an
    // earlier condition already fails.
    let thumb_tip = pixel_y(LandmarkIdx::ThumbTip)?;
    let thumb_ip = pixel_y(LandmarkIdx::ThumbIp)?;
    let mut folded = [(0.0, 0.0); 4];
    for (out, &(tip, mcp)) in folded.iter_mut().zip(&FOLDED) {
        *out = (pixel_y(tip)?, pixel_y(mcp)?);
    }

    let thumb_extended = thumb_tip < thumb_ip;
    Ok(thumb_extended && folded.iter().all(|&(tip, mcp)| tip > mcp))
}

/// Returns the index of the first hand in `hands` showing a thumbs up.
///
/// Hands that [`classify`] rejects are logged and skipped.
pub fn first_thumbs_up(hands: &[HandPose], frame_height: f32) -> Option<usize> {
    hands
        .iter()
        .enumerate()
        .find_map(|(i, hand)| match classify(hand, frame_height) {
            Ok(true) => Some(i),
            Ok(false) => None,
            Err(e) => {
                log::warn!("ignoring hand #{i}: {e}");
                None
            }
        })
}

/// Reduces all hands detected in a frame to the gesture signal fed to the capture state machine.
pub fn gesture_present(hands: &[HandPose], frame_height: f32) -> bool {
    first_thumbs_up(hands, frame_height).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::landmark::Position;

    const FRAME_HEIGHT: f32 = 480.0;

    /// Builds a pose from pixel-space Y coordinates of the ten relevant landmarks. All other
    /// landmarks sit in the middle of the frame.
    struct PoseBuilder {
        positions: [Position; HandPose::NUM_LANDMARKS],
    }

    impl PoseBuilder {
        fn new() -> Self {
            Self {
                positions: [[0.5, 0.5, 0.0]; HandPose::NUM_LANDMARKS],
            }
        }

        /// The canonical thumbs up: thumb pointing up, all four fingers curled below their
        /// knuckles.
        fn thumbs_up() -> Self {
            Self::new()
                .y(LandmarkIdx::ThumbTip, 50.0)
                .y(LandmarkIdx::ThumbIp, 80.0)
                .y(LandmarkIdx::IndexFingerTip, 140.0)
                .y(LandmarkIdx::IndexFingerMcp, 100.0)
                .y(LandmarkIdx::MiddleFingerTip, 150.0)
                .y(LandmarkIdx::MiddleFingerMcp, 110.0)
                .y(LandmarkIdx::RingFingerTip, 160.0)
                .y(LandmarkIdx::RingFingerMcp, 120.0)
                .y(LandmarkIdx::PinkyTip, 170.0)
                .y(LandmarkIdx::PinkyMcp, 130.0)
        }

        fn y(mut self, idx: LandmarkIdx, pixel_y: f32) -> Self {
            self.positions[idx as usize][1] = pixel_y / FRAME_HEIGHT;
            self
        }

        fn build(&self) -> HandPose {
            HandPose::new(self.positions.to_vec())
        }
    }

    fn check(pose: &HandPose) -> bool {
        classify(pose, FRAME_HEIGHT).unwrap()
    }

    #[test]
    fn thumbs_up() {
        assert!(check(&PoseBuilder::thumbs_up().build()));
    }

    #[test]
    fn thumb_folded() {
        // IP joint above the tip.
        let pose = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::ThumbTip, 90.0)
            .build();
        assert!(!check(&pose));
    }

    #[test]
    fn index_extended() {
        let pose = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::IndexFingerTip, 60.0)
            .build();
        assert!(!check(&pose));
    }

    #[test]
    fn middle_extended() {
        let pose = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::MiddleFingerTip, 60.0)
            .build();
        assert!(!check(&pose));
    }

    #[test]
    fn ring_extended() {
        let pose = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::RingFingerTip, 60.0)
            .build();
        assert!(!check(&pose));
    }

    #[test]
    fn pinky_extended() {
        let pose = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::PinkyTip, 60.0)
            .build();
        assert!(!check(&pose));
    }

    #[test]
    fn comparisons_are_strict() {
        let pose = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::ThumbTip, 80.0)
            .build();
        assert!(!check(&pose));

        let pose = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::PinkyTip, 130.0)
            .build();
        assert!(!check(&pose));
    }

    #[test]
    fn open_palm() {
        let pose = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::IndexFingerTip, 20.0)
            .y(LandmarkIdx::MiddleFingerTip, 10.0)
            .y(LandmarkIdx::RingFingerTip, 20.0)
            .y(LandmarkIdx::PinkyTip, 40.0)
            .build();
        assert!(!check(&pose));
    }

    #[test]
    fn thumbs_down() {
        let pose = PoseBuilder::new()
            .y(LandmarkIdx::ThumbTip, 400.0)
            .y(LandmarkIdx::ThumbIp, 370.0)
            .y(LandmarkIdx::IndexFingerTip, 300.0)
            .y(LandmarkIdx::IndexFingerMcp, 340.0)
            .y(LandmarkIdx::MiddleFingerTip, 290.0)
            .y(LandmarkIdx::MiddleFingerMcp, 330.0)
            .y(LandmarkIdx::RingFingerTip, 280.0)
            .y(LandmarkIdx::RingFingerMcp, 320.0)
            .y(LandmarkIdx::PinkyTip, 270.0)
            .y(LandmarkIdx::PinkyMcp, 310.0)
            .build();
        assert!(!check(&pose));
    }

    #[test]
    fn x_and_z_are_ignored() {
        let mut builder = PoseBuilder::thumbs_up();
        for (i, pos) in builder.positions.iter_mut().enumerate() {
            pos[0] = i as f32 * 0.37 % 1.0;
            pos[2] = -(i as f32);
        }
        assert!(check(&builder.build()));
    }

    #[test]
    fn missing_landmarks() {
        let full = PoseBuilder::thumbs_up().build();

        let pose = HandPose::new(full.positions()[..4].to_vec());
        assert_eq!(
            classify(&pose, FRAME_HEIGHT),
            Err(ClassifyError::MissingLandmark(LandmarkIdx::ThumbTip))
        );

        let pose = HandPose::new(full.positions()[..20].to_vec());
        assert_eq!(
            classify(&pose, FRAME_HEIGHT),
            Err(ClassifyError::MissingLandmark(LandmarkIdx::PinkyTip))
        );

        assert_eq!(
            classify(&HandPose::new(Vec::new()), FRAME_HEIGHT),
            Err(ClassifyError::MissingLandmark(LandmarkIdx::ThumbTip))
        );
    }

    #[test]
    fn missing_landmark_reported_even_if_thumb_is_down() {
        // The thumb alone already rules out a thumbs up, but the pose is still incomplete.
        let full = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::ThumbTip, 90.0)
            .build();
        let pose = HandPose::new(full.positions()[..10].to_vec());
        assert_eq!(
            classify(&pose, FRAME_HEIGHT),
            Err(ClassifyError::MissingLandmark(LandmarkIdx::MiddleFingerTip))
        );
    }

    #[test]
    fn non_finite_landmark() {
        let mut builder = PoseBuilder::thumbs_up();
        builder.positions[LandmarkIdx::RingFingerMcp as usize][1] = f32::NAN;
        assert_eq!(
            classify(&builder.build(), FRAME_HEIGHT),
            Err(ClassifyError::NonFinite(LandmarkIdx::RingFingerMcp))
        );
    }

    #[test]
    fn invalid_frame_height() {
        let pose = PoseBuilder::thumbs_up().build();
        assert!(matches!(
            classify(&pose, 0.0),
            Err(ClassifyError::InvalidFrameHeight(_))
        ));
        assert!(matches!(
            classify(&pose, f32::INFINITY),
            Err(ClassifyError::InvalidFrameHeight(_))
        ));
    }

    #[test]
    fn frame_height_does_not_change_decision() {
        let pose = PoseBuilder::thumbs_up().build();
        for height in [1.0, 240.0, 720.0, 2160.0] {
            assert!(classify(&pose, height).unwrap(), "height {height}");
        }
    }

    #[test]
    fn random_poses_agree_with_rule() {
        let mut rng = fastrand::Rng::with_seed(0x7417);
        for _ in 0..1000 {
            let positions = (0..HandPose::NUM_LANDMARKS)
                .map(|_| [rng.f32(), rng.f32(), rng.f32() - 0.5])
                .collect::<Vec<_>>();
            let y = |idx: LandmarkIdx| positions[idx as usize][1] * FRAME_HEIGHT;
            let expected = y(LandmarkIdx::ThumbTip) < y(LandmarkIdx::ThumbIp)
                && FOLDED.iter().all(|&(tip, mcp)| y(tip) > y(mcp));

            let pose = HandPose::new(positions.clone());
            assert_eq!(check(&pose), expected, "{positions:?}");
        }
    }

    #[test]
    fn first_matching_hand_wins() {
        let fist = PoseBuilder::thumbs_up()
            .y(LandmarkIdx::ThumbTip, 90.0)
            .build();
        let up = PoseBuilder::thumbs_up().build();
        let broken = HandPose::new(vec![[0.5, 0.5, 0.0]; 3]);

        assert_eq!(first_thumbs_up(&[], FRAME_HEIGHT), None);
        assert_eq!(first_thumbs_up(&[fist.clone()], FRAME_HEIGHT), None);
        assert_eq!(
            first_thumbs_up(&[fist.clone(), up.clone(), up.clone()], FRAME_HEIGHT),
            Some(1)
        );
        assert_eq!(
            first_thumbs_up(&[broken.clone(), fist, up], FRAME_HEIGHT),
            Some(2)
        );
        assert!(!gesture_present(&[broken], FRAME_HEIGHT));
    }
}
