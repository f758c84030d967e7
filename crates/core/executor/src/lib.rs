//! Builtins of the starkvm execution segments.
//!
//! A builtin owns a memory segment and checks every value written to it. The ecdsa builtin
//! verifies a Stark ECDSA signature for every instance of its segment, and exports the signatures
//! as the AIR private input of the prover.

#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![warn(missing_docs)]

pub mod builtins;
pub mod memory;
pub mod opts;
pub mod utils;

pub use builtins::*;
pub use memory::*;
pub use opts::*;
