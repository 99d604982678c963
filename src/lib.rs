pub mod config;
pub mod error;
pub mod exercise;
pub mod geometry;
pub mod pose;
pub mod protocol;
pub mod server;
pub mod session;
