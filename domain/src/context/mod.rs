//! Context window management.
//!
//! - [`window::ContextWindow`]: how many exchanges a session keeps, and how
//! - [`window::truncate`]: the sliding-window truncation rule

pub mod window;
