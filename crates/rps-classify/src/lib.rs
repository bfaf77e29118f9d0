use rps_hand::{Finger, LandmarkSet, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fingers at or above this interior angle count as extended
pub const DEFAULT_ANGLE_CUTOFF: f32 = 90.0;

/// The three gestures a hand can be read as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Rock,
    Paper,
    Scissors,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Rock => write!(f, "rock"),
            Label::Paper => write!(f, "paper"),
            Label::Scissors => write!(f, "scissors"),
        }
    }
}

/// One classifier verdict for one frame.
///
/// The three "-iness" scores are signed relative intensities, not
/// probabilities: they are unnormalized, may leave any fixed range, and
/// are only meant to drive display-color intensity. The label never
/// depends on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub top_angle: f32,
    pub bottom_angle: f32,
    pub label: Label,
    pub rockiness: f32,
    pub paperiness: f32,
    pub scissoriness: f32,
}

/// A gesture classifier: a total function of one complete landmark set.
/// Implementations carry no per-frame state and never fail.
pub trait Classifier: Send {
    fn classify(&self, hand: &LandmarkSet) -> Classification;
}

/// Shared decision table: which finger pairs are extended decides the
/// label, a strict three-way partition with no ties.
fn decide(top_extended: bool, bottom_extended: bool) -> Label {
    match (top_extended, bottom_extended) {
        (true, true) => Label::Paper,
        (false, false) => Label::Rock,
        _ => Label::Scissors,
    }
}

/// Interior angle at the knuckle between the tip and base segments, in
/// degrees. 180 is a fully straight finger, 0 a fully curled one.
fn knuckle_angle(tip: Point, knuckle: Point, base: Point) -> f32 {
    let to_tip = (tip.x - knuckle.x, tip.y - knuckle.y, tip.z - knuckle.z);
    let to_base = (base.x - knuckle.x, base.y - knuckle.y, base.z - knuckle.z);

    let dot = to_tip.0 * to_base.0 + to_tip.1 * to_base.1 + to_tip.2 * to_base.2;
    let mag_tip = (to_tip.0 * to_tip.0 + to_tip.1 * to_tip.1 + to_tip.2 * to_tip.2).sqrt();
    let mag_base = (to_base.0 * to_base.0 + to_base.1 * to_base.1 + to_base.2 * to_base.2).sqrt();

    // Coincident landmarks give no direction to measure; call it straight
    if mag_tip < 1e-6 || mag_base < 1e-6 {
        return 180.0;
    }

    let cosine = (dot / (mag_tip * mag_base)).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

/// Classifies by the interior angles fingers make at their knuckles.
/// The more reliable of the two variants; the only one whose angle and
/// score fields carry real values.
#[derive(Debug, Clone, Copy)]
pub struct AngleClassifier {
    angle_cutoff: f32,
}

impl AngleClassifier {
    pub fn new(angle_cutoff: f32) -> Self {
        Self { angle_cutoff }
    }
}

impl Default for AngleClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ANGLE_CUTOFF)
    }
}

impl Classifier for AngleClassifier {
    fn classify(&self, hand: &LandmarkSet) -> Classification {
        let angle = |finger: Finger| {
            let (tip, knuckle, base) = hand.finger(finger);
            knuckle_angle(tip, knuckle, base)
        };

        let top_angle = (angle(Finger::Index) + angle(Finger::Middle)) / 2.0;
        let bottom_angle = (angle(Finger::Ring) + angle(Finger::Pinky)) / 2.0;

        // Inclusive cutoff: an angle exactly at the threshold is extended
        let top_extended = top_angle >= self.angle_cutoff;
        let bottom_extended = bottom_angle >= self.angle_cutoff;

        let top_margin = top_angle - self.angle_cutoff;
        let bottom_margin = bottom_angle - self.angle_cutoff;

        Classification {
            top_angle,
            bottom_angle,
            label: decide(top_extended, bottom_extended),
            rockiness: -(top_margin + bottom_margin),
            paperiness: top_margin + bottom_margin,
            scissoriness: top_margin - bottom_margin,
        }
    }
}

/// Classifies by whether fingertips reach further from the palm than the
/// finger bases do. Cheaper than the angle variant, but its angle and
/// score fields are fixed placeholders; only the label is meaningful.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceClassifier;

impl DistanceClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Averages tip-beyond-base reach over an adjacent finger pair;
    /// a positive average means the pair is extended.
    fn pair_extended(hand: &LandmarkSet, first: Finger, second: Finger) -> bool {
        let palm = hand.wrist();
        let reach = |finger: Finger| {
            let (tip, _, base) = hand.finger(finger);
            tip.distance(&palm) - base.distance(&palm)
        };
        (reach(first) + reach(second)) / 2.0 > 0.0
    }
}

impl Classifier for DistanceClassifier {
    fn classify(&self, hand: &LandmarkSet) -> Classification {
        let top_extended = Self::pair_extended(hand, Finger::Index, Finger::Middle);
        let bottom_extended = Self::pair_extended(hand, Finger::Ring, Finger::Pinky);

        Classification {
            top_angle: 1.0,
            bottom_angle: 1.0,
            label: decide(top_extended, bottom_extended),
            rockiness: 1.0,
            paperiness: 1.0,
            scissoriness: 1.0,
        }
    }
}

/// Per-label intensity weights for the display color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorWeights {
    pub rock: f32,
    pub scissors: f32,
    pub paper: f32,
}

impl Default for ColorWeights {
    fn default() -> Self {
        Self {
            rock: 1.0,
            scissors: 1.0,
            paper: 1.5,
        }
    }
}

/// BGR color signal for the presentation layer: each channel scales with
/// how strongly the frame leaned toward the matching gesture.
pub fn display_color(result: &Classification, weights: &ColorWeights) -> [f32; 3] {
    [
        result.rockiness * weights.rock,
        result.scissoriness * weights.scissors,
        result.paperiness * weights.paper,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rps_hand::LANDMARK_COUNT;

    /// Builds a synthetic hand. The wrist sits below the fingers; each
    /// finger is a vertical column. A straight finger has its tip beyond
    /// the knuckle (interior angle 180, tip far from the wrist); a curled
    /// one folds the tip back toward the wrist (angle 0, tip closer to the
    /// wrist than the base).
    fn hand(top_straight: bool, bottom_straight: bool) -> LandmarkSet {
        let mut points = [Point::default(); LANDMARK_COUNT];
        points[rps_hand::WRIST] = Point::new(0.5, 0.9, 0.0);

        let fingers = [
            (Finger::Index, 0.3, top_straight),
            (Finger::Middle, 0.4, top_straight),
            (Finger::Ring, 0.6, bottom_straight),
            (Finger::Pinky, 0.7, bottom_straight),
        ];
        for (finger, x, straight) in fingers {
            points[finger.base()] = Point::new(x, 0.5, 0.0);
            points[finger.knuckle()] = Point::new(x, 0.4, 0.0);
            points[finger.tip()] = if straight {
                Point::new(x, 0.2, 0.0)
            } else {
                Point::new(x, 0.6, 0.0)
            };
        }
        LandmarkSet::new(points)
    }

    /// A hand whose finger-pair angles are exactly 90 degrees
    fn right_angle_hand() -> LandmarkSet {
        let mut points = [Point::default(); LANDMARK_COUNT];
        points[rps_hand::WRIST] = Point::new(0.5, 0.9, 0.0);
        for (finger, x) in [
            (Finger::Index, 0.3),
            (Finger::Middle, 0.4),
            (Finger::Ring, 0.6),
            (Finger::Pinky, 0.7),
        ] {
            points[finger.base()] = Point::new(x, 0.5, 0.0);
            points[finger.knuckle()] = Point::new(x, 0.4, 0.0);
            points[finger.tip()] = Point::new(x + 0.1, 0.4, 0.0);
        }
        LandmarkSet::new(points)
    }

    #[test]
    fn test_knuckle_angle_straight_and_folded() {
        let straight = knuckle_angle(
            Point::new(0.0, 0.2, 0.0),
            Point::new(0.0, 0.4, 0.0),
            Point::new(0.0, 0.5, 0.0),
        );
        assert!((straight - 180.0).abs() < 0.5, "got {}", straight);

        let folded = knuckle_angle(
            Point::new(0.0, 0.6, 0.0),
            Point::new(0.0, 0.4, 0.0),
            Point::new(0.0, 0.5, 0.0),
        );
        assert!(folded < 0.5, "got {}", folded);
    }

    #[test]
    fn test_knuckle_angle_degenerate_is_straight() {
        let p = Point::new(0.5, 0.5, 0.0);
        assert_eq!(knuckle_angle(p, p, p), 180.0);
    }

    #[test]
    fn test_angle_classifier_labels() {
        let classifier = AngleClassifier::default();
        assert_eq!(classifier.classify(&hand(true, true)).label, Label::Paper);
        assert_eq!(classifier.classify(&hand(false, false)).label, Label::Rock);
        assert_eq!(classifier.classify(&hand(true, false)).label, Label::Scissors);
        assert_eq!(classifier.classify(&hand(false, true)).label, Label::Scissors);
    }

    #[test]
    fn test_cutoff_boundary_counts_as_extended() {
        // Both pairs at exactly the cutoff must read as paper
        let classifier = AngleClassifier::new(90.0);
        let result = classifier.classify(&right_angle_hand());
        assert!((result.top_angle - 90.0).abs() < 0.5);
        assert_eq!(result.label, Label::Paper);
    }

    #[test]
    fn test_angle_scores_track_margins() {
        let classifier = AngleClassifier::new(90.0);
        let paper = classifier.classify(&hand(true, true));
        assert!(paper.paperiness > 0.0);
        assert!(paper.rockiness < 0.0);
        assert!((paper.paperiness + paper.rockiness).abs() < 1e-3);

        let rock = classifier.classify(&hand(false, false));
        assert!(rock.rockiness > 0.0);
        assert!(rock.paperiness < 0.0);

        let scissors = classifier.classify(&hand(true, false));
        assert!(scissors.scissoriness > 0.0);
    }

    #[test]
    fn test_distance_classifier_labels() {
        let classifier = DistanceClassifier::new();
        assert_eq!(classifier.classify(&hand(true, true)).label, Label::Paper);
        assert_eq!(classifier.classify(&hand(false, false)).label, Label::Rock);
        assert_eq!(classifier.classify(&hand(true, false)).label, Label::Scissors);
        assert_eq!(classifier.classify(&hand(false, true)).label, Label::Scissors);
    }

    #[test]
    fn test_distance_classifier_keeps_placeholder_diagnostics() {
        // Only the label is meaningful for this variant; the other fields
        // are pinned so a change is deliberate.
        let result = DistanceClassifier::new().classify(&hand(true, true));
        assert_eq!(result.top_angle, 1.0);
        assert_eq!(result.bottom_angle, 1.0);
        assert_eq!(result.rockiness, 1.0);
        assert_eq!(result.paperiness, 1.0);
        assert_eq!(result.scissoriness, 1.0);
    }

    #[test]
    fn test_every_hand_gets_exactly_one_label() {
        // The decision table is total over the four extendedness cases
        for (top, bottom) in [(true, true), (true, false), (false, true), (false, false)] {
            let angle = AngleClassifier::default().classify(&hand(top, bottom)).label;
            let dist = DistanceClassifier::new().classify(&hand(top, bottom)).label;
            assert_eq!(angle, dist);
        }
    }

    #[test]
    fn test_display_color_scales_with_weights() {
        let result = Classification {
            top_angle: 100.0,
            bottom_angle: 100.0,
            label: Label::Paper,
            rockiness: -20.0,
            paperiness: 20.0,
            scissoriness: 0.0,
        };
        let color = display_color(&result, &ColorWeights::default());
        assert_eq!(color, [-20.0, 0.0, 30.0]);
    }
}
