pub mod annotation_stage;
pub mod infrastructure;
pub mod optimize_threshold_use_case;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod process_video_use_case;
pub mod sample_clip_use_case;
