//! Common utilities shared between mrelay crates.

#![warn(missing_docs)]

pub mod time;
