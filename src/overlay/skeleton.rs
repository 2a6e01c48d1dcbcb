//! Skeleton connection table and anatomical group colors

use crate::pose::JointName;

use super::surface::Color;

/// Anatomical groups used for overlay coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyGroup {
    Face,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    Torso,
}

impl BodyGroup {
    pub fn color(&self) -> Color {
        match self {
            BodyGroup::Face => Color::rgb(0, 200, 83),
            BodyGroup::LeftArm => Color::rgb(41, 121, 255),
            BodyGroup::RightArm => Color::rgb(0, 188, 212),
            BodyGroup::LeftLeg => Color::rgb(255, 145, 0),
            BodyGroup::RightLeg => Color::rgb(255, 82, 82),
            BodyGroup::Torso => Color::rgb(171, 71, 188),
        }
    }
}

/// The anatomical group a landmark belongs to.
pub fn group_of(joint: JointName) -> BodyGroup {
    use JointName::*;
    match joint {
        Nose | LeftEye | RightEye | LeftEar | RightEar => BodyGroup::Face,
        LeftShoulder | LeftElbow | LeftWrist => BodyGroup::LeftArm,
        RightShoulder | RightElbow | RightWrist => BodyGroup::RightArm,
        LeftKnee | LeftAnkle => BodyGroup::LeftLeg,
        RightKnee | RightAnkle => BodyGroup::RightLeg,
        LeftHip | RightHip => BodyGroup::Torso,
    }
}

/// Joint pairs forming the skeleton, COCO-style.
pub const CONNECTIONS: [(JointName, JointName); 19] = {
    use JointName::*;
    [
        (LeftAnkle, LeftKnee),
        (LeftKnee, LeftHip),
        (RightAnkle, RightKnee),
        (RightKnee, RightHip),
        (LeftHip, RightHip),
        (LeftShoulder, LeftHip),
        (RightShoulder, RightHip),
        (LeftShoulder, RightShoulder),
        (LeftShoulder, LeftElbow),
        (RightShoulder, RightElbow),
        (LeftElbow, LeftWrist),
        (RightElbow, RightWrist),
        (LeftEye, RightEye),
        (Nose, LeftEye),
        (Nose, RightEye),
        (LeftEye, LeftEar),
        (RightEye, RightEar),
        (LeftEar, LeftShoulder),
        (RightEar, RightShoulder),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_landmark_is_connected() {
        for name in JointName::ALL {
            let connected = CONNECTIONS.iter().any(|(a, b)| *a == name || *b == name);
            assert!(connected, "{} has no skeleton connection", name);
        }
    }

    #[test]
    fn test_groups() {
        assert_eq!(group_of(JointName::Nose), BodyGroup::Face);
        assert_eq!(group_of(JointName::LeftWrist), BodyGroup::LeftArm);
        assert_eq!(group_of(JointName::RightKnee), BodyGroup::RightLeg);
        assert_eq!(group_of(JointName::LeftHip), BodyGroup::Torso);
    }
}
