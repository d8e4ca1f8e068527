pub mod episode_source;
pub mod q_learning_optimizer;
pub mod q_table;
pub mod reward;
pub mod threshold_environment;
pub mod threshold_space;
