//! Per-tick hand pose: positions of tracked points keyed by identifier.
//!
//! Every tracked point (a joint of either hand, or one of the two bellows
//! faces) is addressed by a [`TrackedPoint`] and stored in one map, so code
//! that needs "left index tip" looks it up instead of holding a field per
//! joint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A position in metres, `[x, y, z]`.
pub type Point3 = [f32; 3];

/// Euclidean distance between two points.
pub fn distance(a: Point3, b: Point3) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx*dx + dy*dy + dz*dz).sqrt()
}

fn offset(p: Point3, d: Point3) -> Point3 {
    [p[0] + d[0], p[1] + d[1], p[2] + d[2]]
}

// ════════════════════════════════════════════════════════════════════════════
// Identifiers
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

/// Hand-skeleton joints as reported by the tracking provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Wrist,
    ThumbKnuckle,
    ThumbIntermediateBase,
    ThumbIntermediateTip,
    ThumbTip,
    IndexFingerMetacarpal,
    IndexFingerKnuckle,
    IndexFingerIntermediateBase,
    IndexFingerIntermediateTip,
    IndexFingerTip,
    MiddleFingerMetacarpal,
    MiddleFingerKnuckle,
    MiddleFingerIntermediateBase,
    MiddleFingerIntermediateTip,
    MiddleFingerTip,
    RingFingerMetacarpal,
    RingFingerKnuckle,
    RingFingerIntermediateBase,
    RingFingerIntermediateTip,
    RingFingerTip,
    LittleFingerMetacarpal,
    LittleFingerKnuckle,
    LittleFingerIntermediateBase,
    LittleFingerIntermediateTip,
    LittleFingerTip,
    ForearmWrist,
    ForearmArm,
}

/// Anything whose position can be reported for a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedPoint {
    /// One face of the instrument, held by the given hand.
    BellowsFace(Hand),
    Joint(Hand, JointName),
}

// ════════════════════════════════════════════════════════════════════════════
// PoseFrame
// ════════════════════════════════════════════════════════════════════════════

/// Offset from each wrist to the instrument face it holds.
const LEFT_FACE_OFFSET:  Point3 = [-0.1, 0.1, -0.05];
const RIGHT_FACE_OFFSET: Point3 = [ 0.1, 0.1, -0.05];

/// Positions of every tracked point for one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseFrame {
    points: HashMap<TrackedPoint, Point3>,
}

impl PoseFrame {
    pub fn new() -> Self { Self::default() }

    /// Builder-style insert.
    pub fn with(mut self, point: TrackedPoint, position: Point3) -> Self {
        self.points.insert(point, position);
        self
    }

    pub fn set(&mut self, point: TrackedPoint, position: Point3) {
        self.points.insert(point, position);
    }

    pub fn get(&self, point: TrackedPoint) -> Option<Point3> {
        self.points.get(&point).copied()
    }

    /// Distance between two points, if both are present.
    pub fn distance_between(&self, a: TrackedPoint, b: TrackedPoint) -> Option<f32> {
        Some(distance(self.get(a)?, self.get(b)?))
    }

    pub fn len(&self) -> usize { self.points.len() }
    pub fn is_empty(&self) -> bool { self.points.is_empty() }

    /// Positions of the (left, right) instrument faces.
    ///
    /// Explicit `BellowsFace` points win; otherwise each face is placed at a
    /// fixed offset from the wrist holding it.
    pub fn bellows_anchors(&self) -> Option<(Point3, Point3)> {
        Some((self.face(Hand::Left)?, self.face(Hand::Right)?))
    }

    /// Raw distance between the two instrument faces.
    pub fn bellows_distance(&self) -> Option<f32> {
        let (l, r) = self.bellows_anchors()?;
        Some(distance(l, r))
    }

    fn face(&self, hand: Hand) -> Option<Point3> {
        if let Some(p) = self.get(TrackedPoint::BellowsFace(hand)) {
            return Some(p);
        }
        let wrist = self.get(TrackedPoint::Joint(hand, JointName::Wrist))?;
        Some(match hand {
            Hand::Left  => offset(wrist, LEFT_FACE_OFFSET),
            Hand::Right => offset(wrist, RIGHT_FACE_OFFSET),
        })
    }
}

/// Evenly spaced pleat positions spanning the bellows between two faces.
///
/// The ends are pulled inward and slightly down from the faces so the
/// pleats sit between the hands.  `count < 2` yields just the start point.
pub fn bellows_segments(left_face: Point3, right_face: Point3, count: usize) -> Vec<Point3> {
    let start = offset(left_face,  [ 0.2, -0.1, -0.05]);
    let end   = offset(right_face, [-0.2, -0.1, -0.05]);
    if count < 2 {
        return vec![start; count];
    }
    let step = [
        (end[0] - start[0]) / (count - 1) as f32,
        (end[1] - start[1]) / (count - 1) as f32,
        (end[2] - start[2]) / (count - 1) as f32,
    ];
    (0..count)
        .map(|i| {
            let t = i as f32;
            [start[0] + step[0]*t, start[1] + step[1]*t, start[2] + step[2]*t]
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point3, b: Point3) -> bool {
        distance(a, b) < 1e-6
    }

    #[test]
    fn distance_is_euclidean() {
        assert!((distance([0.0, 0.0, 0.0], [3.0, 4.0, 0.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn explicit_faces_win_over_wrists() {
        let frame = PoseFrame::new()
            .with(TrackedPoint::BellowsFace(Hand::Left),  [0.0, 0.0, 0.0])
            .with(TrackedPoint::BellowsFace(Hand::Right), [0.4, 0.0, 0.0])
            .with(TrackedPoint::Joint(Hand::Left, JointName::Wrist), [9.0, 9.0, 9.0]);
        assert!((frame.bellows_distance().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn faces_derived_from_wrists() {
        let frame = PoseFrame::new()
            .with(TrackedPoint::Joint(Hand::Left,  JointName::Wrist), [-0.2, 1.0, -0.3])
            .with(TrackedPoint::Joint(Hand::Right, JointName::Wrist), [ 0.2, 1.0, -0.3]);
        let (l, r) = frame.bellows_anchors().unwrap();
        assert!(close(l, [-0.3, 1.1, -0.35]));
        assert!(close(r, [ 0.3, 1.1, -0.35]));
    }

    #[test]
    fn missing_hand_means_no_anchors() {
        let frame = PoseFrame::new()
            .with(TrackedPoint::Joint(Hand::Left, JointName::Wrist), [0.0, 0.0, 0.0]);
        assert_eq!(frame.bellows_anchors(), None);
        assert_eq!(frame.bellows_distance(), None);
    }

    #[test]
    fn distance_between_requires_both_points() {
        let tip     = TrackedPoint::Joint(Hand::Left, JointName::IndexFingerTip);
        let knuckle = TrackedPoint::Joint(Hand::Left, JointName::IndexFingerKnuckle);
        let mut frame = PoseFrame::new().with(tip, [0.0, 0.03, 0.0]);
        assert_eq!(frame.distance_between(tip, knuckle), None);
        frame.set(knuckle, [0.0, 0.0, 0.0]);
        assert!((frame.distance_between(tip, knuckle).unwrap() - 0.03).abs() < 1e-6);
    }

    #[test]
    fn segments_span_between_faces() {
        let segs = bellows_segments([-0.5, 1.0, 0.0], [0.5, 1.0, 0.0], 10);
        assert_eq!(segs.len(), 10);
        assert!(close(segs[0], [-0.3, 0.9, -0.05]));
        assert!(close(segs[9], [ 0.3, 0.9, -0.05]));
        let gap0 = distance(segs[0], segs[1]);
        let gap8 = distance(segs[8], segs[9]);
        assert!((gap0 - gap8).abs() < 1e-5);
    }

    #[test]
    fn degenerate_segment_counts() {
        assert!(bellows_segments([0.0; 3], [1.0; 3], 0).is_empty());
        assert_eq!(bellows_segments([0.0; 3], [1.0; 3], 1).len(), 1);
    }

    #[test]
    fn joint_names_use_snake_case() {
        let j: JointName = toml::from_str::<std::collections::HashMap<String, JointName>>(
            "j = \"index_finger_tip\"",
        )
        .unwrap()["j"];
        assert_eq!(j, JointName::IndexFingerTip);
    }
}
