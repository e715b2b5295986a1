//! CLI subcommand implementations

pub mod balance;
pub mod download;
pub mod export;
