//! Analysis modules.

pub mod stats;

pub use stats::*;
