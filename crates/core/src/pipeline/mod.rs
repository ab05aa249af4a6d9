pub mod batch_crop_use_case;
pub mod batch_options;
pub mod finisher;
pub mod infrastructure;
pub mod preview_crop_use_case;
