//! Five-point face landmarks and the pose measures crop geometry relies on.
//!
//! Point order follows the detector output: left eye, right eye, nose,
//! left mouth corner, right mouth corner.

const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;
const NOSE: usize = 2;
const LEFT_MOUTH: usize = 3;
const RIGHT_MOUTH: usize = 4;

/// Landmark weights: [left_eye, right_eye, nose, left_mouth, right_mouth].
const WEIGHTS: [f64; 5] = [2.0, 2.0, 3.0, 1.0, 1.0];

/// Faces turned less than this (see [`FaceLandmarks::profile_ratio`]) count as frontal.
pub const FRONTAL_PROFILE_RATIO: f64 = 0.25;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// Points with x <= 0 are treated as invisible.
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    pub fn nose(&self) -> Option<(f64, f64)> {
        self.visible(NOSE)
    }

    /// Midpoint of the two eyes, when both are visible.
    pub fn eye_center(&self) -> Option<(f64, f64)> {
        Some(midpoint(self.visible(LEFT_EYE)?, self.visible(RIGHT_EYE)?))
    }

    /// Midpoint of the mouth corners; falls back to whichever corner is visible.
    pub fn mouth_center(&self) -> Option<(f64, f64)> {
        match (self.visible(LEFT_MOUTH), self.visible(RIGHT_MOUTH)) {
            (Some(l), Some(r)) => Some(midpoint(l, r)),
            (Some(p), None) | (None, Some(p)) => Some(p),
            (None, None) => None,
        }
    }

    /// Horizontal distance between the eyes, when both are visible.
    pub fn eye_span(&self) -> Option<f64> {
        let l = self.visible(LEFT_EYE)?;
        let r = self.visible(RIGHT_EYE)?;
        Some((r.0 - l.0).abs())
    }

    /// Weighted centroid of visible landmarks.
    ///
    /// The nose dominates because it stays the most stable anchor as the
    /// head turns.
    pub fn center(&self) -> Option<(f64, f64)> {
        let mut wx_sum = 0.0;
        let mut wy_sum = 0.0;
        let mut w_sum = 0.0;

        for (i, (x, y)) in self.points.iter().enumerate() {
            if *x > 0.0 {
                wx_sum += x * WEIGHTS[i];
                wy_sum += y * WEIGHTS[i];
                w_sum += WEIGHTS[i];
            }
        }

        if w_sum == 0.0 {
            return None;
        }
        Some((wx_sum / w_sum, wy_sum / w_sum))
    }

    /// How much the face is turned: 0.0 = frontal, 1.0 = full profile.
    ///
    /// Nose offset from the eye midpoint relative to eye span. Returns 1.0
    /// when an eye or the nose is missing, since a hidden eye is itself a
    /// strong profile cue.
    pub fn profile_ratio(&self) -> f64 {
        let (Some(nose), Some((eye_mid_x, _)), Some(span)) =
            (self.nose(), self.eye_center(), self.eye_span())
        else {
            return 1.0;
        };
        if span <= 0.0 {
            return 1.0;
        }
        ((nose.0 - eye_mid_x).abs() / span).min(1.0)
    }

    pub fn is_frontal(&self) -> bool {
        self.profile_ratio() < FRONTAL_PROFILE_RATIO
    }

    fn visible(&self, idx: usize) -> Option<(f64, f64)> {
        let p = self.points[idx];
        (p.0 > 0.0).then_some(p)
    }
}

fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn frontal_landmarks() -> FaceLandmarks {
        FaceLandmarks::new([
            (440.0, 350.0), // left_eye
            (560.0, 350.0), // right_eye
            (500.0, 420.0), // nose (centered)
            (460.0, 470.0), // left_mouth
            (540.0, 470.0), // right_mouth
        ])
    }

    fn turned_landmarks() -> FaceLandmarks {
        FaceLandmarks::new([
            (120.0, 350.0),
            (180.0, 350.0),
            (100.0, 420.0), // nose well left of the eyes
            (130.0, 470.0),
            (170.0, 470.0),
        ])
    }

    #[test]
    fn test_center_weighted_toward_nose() {
        let (cx, cy) = frontal_landmarks().center().unwrap();
        // (440*2 + 560*2 + 500*3 + 460 + 540) / 9 = 500
        assert_relative_eq!(cx, 500.0, epsilon = 0.01);
        // (350*4 + 420*3 + 470*2) / 9 = 400
        assert_relative_eq!(cy, 400.0, epsilon = 0.01);
    }

    #[test]
    fn test_center_none_when_nothing_visible() {
        assert!(FaceLandmarks::new([(0.0, 0.0); 5]).center().is_none());
    }

    #[test]
    fn test_eye_and_mouth_centers() {
        let lm = frontal_landmarks();
        assert_eq!(lm.eye_center(), Some((500.0, 350.0)));
        assert_eq!(lm.mouth_center(), Some((500.0, 470.0)));
        assert_eq!(lm.eye_span(), Some(120.0));
    }

    #[test]
    fn test_mouth_center_falls_back_to_single_corner() {
        let mut pts = frontal_landmarks().points;
        pts[LEFT_MOUTH] = (0.0, 0.0);
        let lm = FaceLandmarks::new(pts);
        assert_eq!(lm.mouth_center(), Some((540.0, 470.0)));
    }

    #[test]
    fn test_frontal_face_is_frontal() {
        let lm = frontal_landmarks();
        assert_relative_eq!(lm.profile_ratio(), 0.0, epsilon = 0.01);
        assert!(lm.is_frontal());
    }

    #[test]
    fn test_turned_face_is_not_frontal() {
        let lm = turned_landmarks();
        // |100 - 150| / 60
        assert_relative_eq!(lm.profile_ratio(), 50.0 / 60.0, epsilon = 0.01);
        assert!(!lm.is_frontal());
    }

    #[rstest]
    #[case::nose_hidden([(100.0, 100.0), (200.0, 100.0), (0.0, 0.0), (100.0, 150.0), (200.0, 150.0)])]
    #[case::left_eye_hidden([(0.0, 0.0), (200.0, 100.0), (150.0, 120.0), (100.0, 150.0), (200.0, 150.0)])]
    #[case::same_eye_x([(100.0, 100.0), (100.0, 100.0), (150.0, 120.0), (100.0, 150.0), (200.0, 150.0)])]
    fn test_missing_anchors_read_as_profile(#[case] pts: [(f64, f64); 5]) {
        let lm = FaceLandmarks::new(pts);
        assert_relative_eq!(lm.profile_ratio(), 1.0);
        assert!(!lm.is_frontal());
    }
}
