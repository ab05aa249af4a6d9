pub mod aspect_ratio;
pub mod image_filter;
