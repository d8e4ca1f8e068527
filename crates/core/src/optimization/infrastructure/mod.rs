pub mod video_episode_source;
