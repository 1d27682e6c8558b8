//! Command handlers.

pub mod converse;
pub mod show_config;
pub mod speak;
