pub mod detection_worker;
pub mod finishing_pool;
