//! Pose data model, geometry engine, and frame matching

pub mod catalog;
pub mod frame;
pub mod geometry;
pub mod joint;
pub mod matcher;

pub use catalog::{catalog_for, measure, measure_catalog, AngleDefinition, AngleMeasurement, Sport};
pub use frame::{PoseFrame, PoseFrameSet};
pub use geometry::{angle_at, evaluate, peak_velocity, AngleStatus};
pub use joint::{Joint, JointName, Point};
pub use matcher::closest_frame;
