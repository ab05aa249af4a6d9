pub mod cropping;
pub mod detection;
pub mod finishing;
pub mod pipeline;
pub mod shared;
pub mod storage;
