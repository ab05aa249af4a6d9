pub mod aspect_ratio_cropper;
pub mod filters;
