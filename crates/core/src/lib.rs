pub mod annotation;
pub mod detection;
pub mod optimization;
pub mod pipeline;
pub mod shared;
pub mod tracking;
pub mod video;
