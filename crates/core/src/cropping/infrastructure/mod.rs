pub mod landmark_crop_geometry;
