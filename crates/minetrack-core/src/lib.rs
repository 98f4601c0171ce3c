//! minetrack-core - Core library for Minetrack
//!
//! This crate contains the local replica of the mining permit directory,
//! the offline report draft queue, and the sync logic shared by every
//! Minetrack client.

pub mod config;
pub mod db;
pub mod drafts;
pub mod error;
pub mod models;
pub mod network;
pub mod query;
pub mod remote;
pub mod retry;
pub mod services;
pub mod sync;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use models::{Category, Draft, DraftId};
