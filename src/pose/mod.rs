pub mod angle;
pub mod landmark;

pub use angle::{angle_degrees, AngleCalculator, JointAngle, JointTriple, DEFAULT_MIN_VISIBILITY};
pub use landmark::{Landmark, LandmarkFrame, LandmarkIndex};
