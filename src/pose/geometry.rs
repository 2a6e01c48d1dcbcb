//! Pure pose geometry: vertex angles, range evaluation, derived metrics
//!
//! All functions here are stateless and side-effect free so they can be
//! invoked concurrently from independent rendering contexts. Missing joints
//! never raise: results referencing an invisible joint are simply absent.

use super::frame::PoseFrame;
use super::joint::{JointName, Point};

/// Width of the "warning" band outside an ideal range, in degrees.
///
/// Fixed regardless of how wide the ideal range itself is.
pub const WARNING_BAND_DEG: f32 = 15.0;

/// Horizontal slack added to the ankle span when judging balance.
pub const BALANCE_TOLERANCE: f32 = 0.05;

/// Angle at `vertex` between the rays towards `a` and `c`, in degrees.
///
/// Uses the dot-product form of the law of cosines, with the cosine clamped
/// to [-1, 1] so floating-point drift cannot leave the `acos` domain.
/// Returns a value in [0, 180]; degenerate input (either ray of zero length)
/// yields 0 rather than an undefined result.
pub fn angle_at(a: Point, vertex: Point, c: Point) -> f32 {
    let v1 = (a.x - vertex.x, a.y - vertex.y);
    let v2 = (c.x - vertex.x, c.y - vertex.y);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if mag1 < 1e-6 || mag2 < 1e-6 {
        return 0.0;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);

    cos_angle.acos().to_degrees()
}

/// How a measured angle compares to its ideal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleStatus {
    Good,
    Warning,
    Poor,
}

/// Evaluate an angle against an optional ideal `[min, max]` range.
///
/// Within range is `Good`; outside by at most [`WARNING_BAND_DEG`] on either
/// side is `Warning`; further out is `Poor`. Without a range the angle is
/// informational only and always `Good`.
pub fn evaluate(angle: f32, ideal: Option<(f32, f32)>) -> AngleStatus {
    let Some((min, max)) = ideal else {
        return AngleStatus::Good;
    };

    if angle >= min && angle <= max {
        AngleStatus::Good
    } else if angle >= min - WARNING_BAND_DEG && angle <= max + WARNING_BAND_DEG {
        AngleStatus::Warning
    } else {
        AngleStatus::Poor
    }
}

/// Center of mass, approximated as the midpoint of the two hips.
///
/// `None` unless both hips are visible.
pub fn center_of_mass(frame: &PoseFrame) -> Option<Point> {
    let left = frame.visible_position(JointName::LeftHip)?;
    let right = frame.visible_position(JointName::RightHip)?;
    Some(Point::midpoint(left, right))
}

/// Whether the athlete's center of mass sits over the base of support.
///
/// Compares the horizontal offset of the center of mass against the ankle
/// span plus [`BALANCE_TOLERANCE`]. Defaults to balanced whenever too few
/// joints are visible; missing data is never an error here.
pub fn is_balanced(frame: &PoseFrame) -> bool {
    let Some(com) = center_of_mass(frame) else {
        return true;
    };
    let (Some(left), Some(right)) = (
        frame.visible_position(JointName::LeftAnkle),
        frame.visible_position(JointName::RightAnkle),
    ) else {
        return true;
    };

    let min_x = left.x.min(right.x) - BALANCE_TOLERANCE;
    let max_x = left.x.max(right.x) + BALANCE_TOLERANCE;
    com.x >= min_x && com.x <= max_x
}

/// Velocity of a named joint between two frames, in normalized units per
/// second.
///
/// Defined only when the joint is visible in both frames and time actually
/// elapsed between them.
pub fn joint_velocity(name: JointName, from: &PoseFrame, to: &PoseFrame) -> Option<f32> {
    let p1 = from.visible_position(name)?;
    let p2 = to.visible_position(name)?;

    let elapsed = to.timestamp - from.timestamp;
    if elapsed <= 0.0 {
        return None;
    }

    Some(p1.distance_to(p2) / elapsed as f32)
}

/// The single largest inter-frame velocity of a joint across a sequence.
///
/// Returns the index of the earlier frame of the fastest pair together with
/// the velocity magnitude, or `None` when no consecutive pair yields a
/// defined velocity.
pub fn peak_velocity(frames: &[PoseFrame], name: JointName) -> Option<(usize, f32)> {
    let mut peak: Option<(usize, f32)> = None;

    for (i, pair) in frames.windows(2).enumerate() {
        if let Some(v) = joint_velocity(name, &pair[0], &pair[1]) {
            match peak {
                Some((_, best)) if v <= best => {}
                _ => peak = Some((i, v)),
            }
        }
    }

    peak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::joint::Joint;

    fn frame_with(joints: Vec<Joint>, t: f64) -> PoseFrame {
        PoseFrame::new(0, t, joints)
    }

    #[test]
    fn test_right_angle() {
        // Scenario: L-shaped triplet is exactly 90 degrees.
        let angle = angle_at(Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 1.0));
        assert!((angle - 90.0).abs() < 0.01, "expected 90, got {}", angle);
    }

    #[test]
    fn test_straight_line_is_180() {
        let angle = angle_at(Point::new(0.0, 0.0), Point::new(0.5, 0.0), Point::new(1.0, 0.0));
        assert!((angle - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_same_ray_is_zero() {
        let angle = angle_at(Point::new(1.0, 1.0), Point::new(0.0, 0.0), Point::new(2.0, 2.0));
        assert!(angle.abs() < 0.01);
    }

    #[test]
    fn test_degenerate_returns_zero() {
        let p = Point::new(0.3, 0.3);
        assert_eq!(angle_at(p, p, Point::new(1.0, 0.0)), 0.0);
        assert_eq!(angle_at(Point::new(1.0, 0.0), p, p), 0.0);
    }

    #[test]
    fn test_angle_always_in_bounds() {
        let samples = [
            (Point::new(0.1, 0.9), Point::new(0.5, 0.5), Point::new(0.9, 0.1)),
            (Point::new(1.0, 0.0), Point::new(0.0, 0.0), Point::new(0.0, 1.0)),
            (Point::new(-3.0, 2.0), Point::new(1.0, 1.0), Point::new(4.0, -2.0)),
        ];
        for (a, v, c) in samples {
            let angle = angle_at(a, v, c);
            assert!((0.0..=180.0).contains(&angle), "angle {} out of bounds", angle);
        }
    }

    #[test]
    fn test_evaluate_bands() {
        let ideal = Some((90.0, 120.0));
        assert_eq!(evaluate(90.0, ideal), AngleStatus::Good);
        assert_eq!(evaluate(120.0, ideal), AngleStatus::Good);
        assert_eq!(evaluate(105.0, ideal), AngleStatus::Good);
        assert_eq!(evaluate(80.0, ideal), AngleStatus::Warning);
        assert_eq!(evaluate(75.0, ideal), AngleStatus::Warning);
        assert_eq!(evaluate(135.0, ideal), AngleStatus::Warning);
        assert_eq!(evaluate(74.9, ideal), AngleStatus::Poor);
        assert_eq!(evaluate(135.1, ideal), AngleStatus::Poor);
    }

    #[test]
    fn test_evaluate_without_range_is_good() {
        assert_eq!(evaluate(3.0, None), AngleStatus::Good);
        assert_eq!(evaluate(179.0, None), AngleStatus::Good);
    }

    #[test]
    fn test_center_of_mass_needs_both_hips() {
        let frame = frame_with(
            vec![
                Joint::new(JointName::LeftHip, Point::new(0.4, 0.5), true),
                Joint::new(JointName::RightHip, Point::new(0.6, 0.5), false),
            ],
            0.0,
        );
        assert!(center_of_mass(&frame).is_none());

        let frame = frame_with(
            vec![
                Joint::new(JointName::LeftHip, Point::new(0.4, 0.5), true),
                Joint::new(JointName::RightHip, Point::new(0.6, 0.5), true),
            ],
            0.0,
        );
        let com = center_of_mass(&frame).unwrap();
        assert!((com.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_balance_defaults_to_balanced_when_joints_missing() {
        assert!(is_balanced(&frame_with(vec![], 0.0)));
    }

    #[test]
    fn test_balance_detects_offset() {
        let mut joints = vec![
            Joint::new(JointName::LeftHip, Point::new(0.80, 0.5), true),
            Joint::new(JointName::RightHip, Point::new(0.90, 0.5), true),
            Joint::new(JointName::LeftAnkle, Point::new(0.40, 0.9), true),
            Joint::new(JointName::RightAnkle, Point::new(0.50, 0.9), true),
        ];
        assert!(!is_balanced(&frame_with(joints.clone(), 0.0)));

        // Hips over the feet: balanced.
        joints[0].position = Point::new(0.42, 0.5);
        joints[1].position = Point::new(0.48, 0.5);
        assert!(is_balanced(&frame_with(joints, 0.0)));
    }

    #[test]
    fn test_velocity_requires_visibility_in_both_frames() {
        let f0 = frame_with(vec![Joint::new(JointName::RightWrist, Point::new(0.0, 0.0), true)], 0.0);
        let f1 = frame_with(vec![Joint::new(JointName::RightWrist, Point::new(0.3, 0.4), true)], 0.5);
        let v = joint_velocity(JointName::RightWrist, &f0, &f1).unwrap();
        assert!((v - 1.0).abs() < 1e-5);

        let hidden = frame_with(vec![Joint::new(JointName::RightWrist, Point::new(0.3, 0.4), false)], 0.5);
        assert!(joint_velocity(JointName::RightWrist, &f0, &hidden).is_none());
    }

    #[test]
    fn test_peak_velocity_absent_without_valid_pairs() {
        let frames = vec![
            frame_with(vec![Joint::new(JointName::LeftWrist, Point::new(0.1, 0.1), false)], 0.0),
            frame_with(vec![Joint::new(JointName::LeftWrist, Point::new(0.2, 0.2), false)], 0.5),
        ];
        assert!(peak_velocity(&frames, JointName::LeftWrist).is_none());
    }

    #[test]
    fn test_peak_velocity_finds_fastest_pair() {
        let wrist = |x: f32, t: f64| {
            frame_with(vec![Joint::new(JointName::LeftWrist, Point::new(x, 0.0), true)], t)
        };
        let frames = vec![wrist(0.0, 0.0), wrist(0.1, 1.0), wrist(0.5, 2.0), wrist(0.55, 3.0)];
        let (index, v) = peak_velocity(&frames, JointName::LeftWrist).unwrap();
        assert_eq!(index, 1);
        assert!((v - 0.4).abs() < 1e-5);
    }
}
