pub mod crop_dispatch;
pub mod crop_geometry;
pub mod crop_style;
