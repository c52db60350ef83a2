//! Command implementations.

pub mod config;
pub mod enhance;
pub mod serve;
