//! Builtins, the co-processors attached to memory segments.

pub mod allocation;
pub mod ecdsa;

pub use allocation::*;
pub use ecdsa::{EcdsaBuiltin, VerificationError, ECDSA_BUILTIN_NAME};

use thiserror::Error;

use crate::memory::{MemoryError, MemoryValue, Segment};

/// The result of a checked write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The written instance still has unknown cells, nothing was checked.
    Pending,
    /// The written instance is complete and passed the builtin check.
    Verified,
}

/// Errors a VM run halts with when a builtin rejects its memory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuiltinError {
    /// A memory access failed.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// An instance failed its check.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// The builtin cannot deduce the value of a cell.
    #[error("builtin `{builtin}` cannot deduce the value of the cell at offset {offset}")]
    CannotInfer {
        /// The builtin name.
        builtin: &'static str,
        /// The offset of the cell.
        offset: u64,
    },
}

/// A builtin attached to a memory segment.
pub trait BuiltinRunner {
    /// The builtin name.
    fn name(&self) -> &'static str;

    /// Runs the builtin check after `offset` was written in `segment`.
    fn check_write(&self, segment: &Segment, offset: u64) -> Result<CheckOutcome, BuiltinError>;

    /// Deduces the value of an unknown output cell.
    fn infer_value(&self, segment: &Segment, offset: u64) -> Result<MemoryValue, BuiltinError>;

    /// The size of the segment in the final trace, see [`AllocationPolicy`].
    fn allocated_size(&self, used: u64, step_count: u64) -> Result<u64, SizingError>;

    /// The number of memory cells of an instance.
    fn cells_per_instance(&self) -> u64;

    /// The end of the used part of the segment, once execution is over.
    fn stop_pointer(&self) -> Option<u64>;

    /// Records the end of the used part of the segment.
    fn set_stop_pointer(&mut self, pointer: u64);
}

/// A memory segment owned by a builtin, where every write goes through the builtin check.
#[derive(Debug, Clone)]
pub struct BuiltinSegment<B> {
    segment: Segment,
    builtin: B,
}

impl<B: BuiltinRunner> BuiltinSegment<B> {
    /// Attaches `builtin` to a fresh segment with index `segment_index`.
    pub fn new(segment_index: usize, builtin: B) -> Self {
        Self { segment: Segment::new(segment_index), builtin }
    }

    /// The underlying segment.
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// The attached builtin.
    pub fn builtin(&self) -> &B {
        &self.builtin
    }

    /// The attached builtin, mutably, for hints.
    pub fn builtin_mut(&mut self) -> &mut B {
        &mut self.builtin
    }

    /// Writes `value` at `offset`, then runs the builtin check.
    ///
    /// The value stays in memory even if the check fails.
    pub fn write(
        &mut self,
        offset: u64,
        value: impl Into<MemoryValue>,
    ) -> Result<CheckOutcome, BuiltinError> {
        self.segment.write(offset, value.into())?;
        self.builtin.check_write(&self.segment, offset)
    }

    /// Returns the known value at `offset`, or asks the builtin to deduce it.
    pub fn read_or_infer(&self, offset: u64) -> Result<MemoryValue, BuiltinError> {
        match self.segment.peek(offset) {
            Some(value) => Ok(*value),
            None => self.builtin.infer_value(&self.segment, offset),
        }
    }

    /// Sizes the segment after `step_count` VM steps.
    pub fn allocated_size(&self, step_count: u64) -> Result<u64, SizingError> {
        self.builtin.allocated_size(self.segment.used_size(), step_count)
    }

    /// Sets the stop pointer to the used size of the segment and returns it.
    pub fn finalize(&mut self) -> u64 {
        let used = self.segment.used_size();
        self.builtin.set_stop_pointer(used);
        used
    }

    /// Splits into the segment and the builtin.
    pub fn into_parts(self) -> (Segment, B) {
        (self.segment, self.builtin)
    }
}
