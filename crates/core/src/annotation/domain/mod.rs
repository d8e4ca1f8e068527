pub mod annotation_sink;
pub mod drawable_box;
pub mod frame_annotator;
pub mod frame_renderer;
