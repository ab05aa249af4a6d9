pub mod detection_outcome;
pub mod face_detector;
pub mod face_landmarks;
