pub mod client;
pub mod config;
pub mod humanize;
pub mod normalize;
pub mod observability;
pub mod render;
pub mod upload;
