//! Bookshelf application library
//!
//! Application modules and the helpers they share, mounted by the
//! `bookshelf` binary on top of the kernel and HTTP crates.

pub mod modules;
pub mod utils;

/// Re-export commonly used types
pub use modules::*;
