pub mod cancellation;
pub mod constants;
pub mod errors;
pub mod face_box;
pub mod image_metadata;
