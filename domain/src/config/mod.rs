//! Configuration validation types shared by every config source.

pub mod validation;
