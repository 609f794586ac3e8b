pub mod angle;
pub mod detector;
pub mod extractor;
pub mod keypoint;
pub mod preprocess;

pub use angle::{angle_at_vertex, knee_angle, Point2};
pub use detector::PoseDetector;
pub use extractor::{AngleSource, LabeledBox, Observation, PoseAngleExtractor};
pub use keypoint::{bbox_from_keypoints, BBox, Keypoint, KeypointIndex, Pose};
pub use preprocess::preprocess_for_movenet;
