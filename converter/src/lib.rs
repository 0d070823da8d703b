pub mod api;
pub mod config;
pub mod progress;
pub mod scheduler;
pub mod summary;
