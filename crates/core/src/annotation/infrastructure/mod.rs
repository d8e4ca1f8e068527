pub mod box_renderer;
pub mod flagged_frame_sink;
pub mod json_lines_log;
