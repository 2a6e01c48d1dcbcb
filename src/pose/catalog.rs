//! Per-sport angle catalogs
//!
//! Each sport carries a static catalog of named joint-triplet angles, some
//! with an ideal degree range. The vertex is always the middle joint of the
//! triplet. An angle is measured for a frame only when all three referenced
//! joints are visible; otherwise it is omitted, never defaulted.

use serde::{Deserialize, Serialize};

use super::frame::PoseFrame;
use super::geometry::angle_at;
use super::joint::JointName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Basketball,
    Tennis,
    Golf,
    Weightlifting,
    Running,
    General,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Basketball => "basketball",
            Sport::Tennis => "tennis",
            Sport::Golf => "golf",
            Sport::Weightlifting => "weightlifting",
            Sport::Running => "running",
            Sport::General => "general",
        }
    }

    pub fn parse(value: &str) -> Option<Sport> {
        match value.to_lowercase().as_str() {
            "basketball" => Some(Sport::Basketball),
            "tennis" => Some(Sport::Tennis),
            "golf" => Some(Sport::Golf),
            "weightlifting" => Some(Sport::Weightlifting),
            "running" => Some(Sport::Running),
            "general" => Some(Sport::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named angle in a sport's catalog: `(a, vertex, c)` with the vertex in
/// the middle, and an optional ideal `[min, max]` degree range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleDefinition {
    pub label: &'static str,
    pub triplet: (JointName, JointName, JointName),
    pub ideal: Option<(f32, f32)>,
}

impl AngleDefinition {
    pub const fn new(
        label: &'static str,
        triplet: (JointName, JointName, JointName),
        ideal: Option<(f32, f32)>,
    ) -> Self {
        AngleDefinition { label, triplet, ideal }
    }

    pub fn vertex(&self) -> JointName {
        self.triplet.1
    }
}

use JointName::*;

const BASKETBALL: &[AngleDefinition] = &[
    AngleDefinition::new("shooting elbow", (RightShoulder, RightElbow, RightWrist), Some((80.0, 100.0))),
    AngleDefinition::new("off elbow", (LeftShoulder, LeftElbow, LeftWrist), None),
    AngleDefinition::new("knee bend", (RightHip, RightKnee, RightAnkle), Some((110.0, 140.0))),
    AngleDefinition::new("hip hinge", (RightShoulder, RightHip, RightKnee), Some((140.0, 170.0))),
];

const TENNIS: &[AngleDefinition] = &[
    AngleDefinition::new("racket elbow", (RightShoulder, RightElbow, RightWrist), Some((100.0, 140.0))),
    AngleDefinition::new("shoulder turn", (RightElbow, RightShoulder, RightHip), Some((60.0, 110.0))),
    AngleDefinition::new("front knee", (LeftHip, LeftKnee, LeftAnkle), Some((120.0, 160.0))),
];

const GOLF: &[AngleDefinition] = &[
    AngleDefinition::new("lead arm", (LeftWrist, LeftElbow, LeftShoulder), Some((160.0, 180.0))),
    AngleDefinition::new("spine tilt", (Nose, LeftHip, LeftKnee), None),
    AngleDefinition::new("trail knee", (RightHip, RightKnee, RightAnkle), Some((130.0, 160.0))),
];

const WEIGHTLIFTING: &[AngleDefinition] = &[
    AngleDefinition::new("left knee", (LeftHip, LeftKnee, LeftAnkle), Some((70.0, 100.0))),
    AngleDefinition::new("right knee", (RightHip, RightKnee, RightAnkle), Some((70.0, 100.0))),
    AngleDefinition::new("back angle", (LeftShoulder, LeftHip, LeftKnee), Some((45.0, 80.0))),
    AngleDefinition::new("left elbow", (LeftShoulder, LeftElbow, LeftWrist), None),
];

const RUNNING: &[AngleDefinition] = &[
    AngleDefinition::new("left knee drive", (LeftHip, LeftKnee, LeftAnkle), Some((90.0, 130.0))),
    AngleDefinition::new("right knee drive", (RightHip, RightKnee, RightAnkle), Some((90.0, 130.0))),
    AngleDefinition::new("arm swing", (RightShoulder, RightElbow, RightWrist), Some((70.0, 110.0))),
];

const GENERAL: &[AngleDefinition] = &[
    AngleDefinition::new("left elbow", (LeftShoulder, LeftElbow, LeftWrist), None),
    AngleDefinition::new("right elbow", (RightShoulder, RightElbow, RightWrist), None),
    AngleDefinition::new("left knee", (LeftHip, LeftKnee, LeftAnkle), None),
    AngleDefinition::new("right knee", (RightHip, RightKnee, RightAnkle), None),
];

/// The static angle catalog for a sport.
pub fn catalog_for(sport: Sport) -> &'static [AngleDefinition] {
    match sport {
        Sport::Basketball => BASKETBALL,
        Sport::Tennis => TENNIS,
        Sport::Golf => GOLF,
        Sport::Weightlifting => WEIGHTLIFTING,
        Sport::Running => RUNNING,
        Sport::General => GENERAL,
    }
}

/// A measured catalog angle for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleMeasurement {
    pub label: &'static str,
    pub degrees: f32,
    pub triplet: (JointName, JointName, JointName),
    pub timestamp: f64,
    pub frame_number: u32,
}

/// Measure one catalog angle on a frame.
///
/// `None` whenever any of the three referenced joints is not visible.
pub fn measure(frame: &PoseFrame, def: &AngleDefinition) -> Option<AngleMeasurement> {
    let (a, vertex, c) = def.triplet;
    let pa = frame.visible_position(a)?;
    let pv = frame.visible_position(vertex)?;
    let pc = frame.visible_position(c)?;

    Some(AngleMeasurement {
        label: def.label,
        degrees: angle_at(pa, pv, pc),
        triplet: def.triplet,
        timestamp: frame.timestamp,
        frame_number: frame.frame_number,
    })
}

/// Measure every catalog angle of a sport for one frame, omitting angles
/// whose joints are not fully visible.
pub fn measure_catalog(frame: &PoseFrame, sport: Sport) -> Vec<AngleMeasurement> {
    catalog_for(sport)
        .iter()
        .filter_map(|def| measure(frame, def))
        .collect()
}
