pub mod scalar_kalman;
pub mod track_registry;
