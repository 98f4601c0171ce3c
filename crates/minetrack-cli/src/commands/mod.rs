pub mod browse;
pub mod common;
pub mod completions;
pub mod config;
pub mod draft;
pub mod filters;
pub mod status;
pub mod sync;
