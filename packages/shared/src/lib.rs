//! Utilities shared by the ordertalk crates.

pub mod logger;
pub mod time;
