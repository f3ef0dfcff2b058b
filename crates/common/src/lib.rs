pub mod config;
pub mod duration;
pub mod error;
pub mod host;
pub mod types;
