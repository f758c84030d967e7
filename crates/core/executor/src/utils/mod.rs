//! Helpers shared by binaries and tests.

mod logger;

pub use logger::*;
