pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod roi;
pub mod video_metadata;
