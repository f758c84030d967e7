//! Write-once memory segments.

use std::fmt;

use starkvm_curves::Felt;
use thiserror::Error;
use vec_map::{Entry, VecMap};

/// A pointer into another memory segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Relocatable {
    /// The segment the pointer refers to.
    pub segment_index: usize,
    /// The offset within that segment.
    pub offset: u64,
}

impl Relocatable {
    /// Creates a new pointer.
    #[must_use]
    pub const fn new(segment_index: usize, offset: u64) -> Self {
        Self { segment_index, offset }
    }
}

impl fmt::Display for Relocatable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment_index, self.offset)
    }
}

/// The content of a known memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryValue {
    /// A field element.
    Felt(Felt),
    /// A pointer into a (possibly different) segment.
    Relocatable(Relocatable),
}

impl MemoryValue {
    /// Returns the field element, or `None` for a pointer.
    #[must_use]
    pub fn felt(&self) -> Option<&Felt> {
        match self {
            Self::Felt(felt) => Some(felt),
            Self::Relocatable(_) => None,
        }
    }
}

impl From<Felt> for MemoryValue {
    fn from(value: Felt) -> Self {
        Self::Felt(value)
    }
}

impl From<Relocatable> for MemoryValue {
    fn from(value: Relocatable) -> Self {
        Self::Relocatable(value)
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Felt(felt) => write!(f, "{felt:#x}"),
            Self::Relocatable(ptr) => write!(f, "{ptr}"),
        }
    }
}

/// Errors raised by segment accesses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The cell has not been written yet.
    #[error("unknown value for memory cell at offset {offset}")]
    UnknownCell {
        /// The offset of the cell within its segment.
        offset: u64,
    },

    /// The cell holds a pointer where a field element was expected.
    #[error("expected a field element at offset {offset}, found a pointer")]
    NotAFelt {
        /// The offset of the cell within its segment.
        offset: u64,
    },

    /// The cell is already known with a different value.
    #[error("inconsistent memory assignment at offset {offset}: {old} != {new}")]
    InconsistentWrite {
        /// The offset of the cell within its segment.
        offset: u64,
        /// The value already in the cell.
        old: MemoryValue,
        /// The rejected value.
        new: MemoryValue,
    },

    /// The offset lies beyond the addressable part of a segment.
    #[error("offset {offset} is out of range, segments hold at most {max} cells")]
    OffsetOutOfRange {
        /// The rejected offset.
        offset: u64,
        /// The number of addressable cells.
        max: u64,
    },
}

/// The number of cells a segment can address. Offsets at or above it are rejected.
pub const MAX_SEGMENT_SIZE: u64 = 1 << 32;

/// The base 2 logarithm of the number of cells in a page.
const LOG_PAGE_LEN: usize = 14;
/// The number of cells in a page.
const PAGE_LEN: usize = 1 << LOG_PAGE_LEN;
/// The mask for retrieving the index of a cell within its page.
const PAGE_MASK: usize = PAGE_LEN - 1;

/// A page of cells.
#[derive(Clone, Debug, Default)]
struct Page(VecMap<MemoryValue>);

/// A write-once memory segment.
///
/// Every cell is either unknown or holds a value that never changes afterwards. Offsets are
/// relative to the start of the segment. Cells are stored in pages, so that a write far from the
/// others only allocates the page it lands in.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    index: usize,
    page_table: VecMap<Page>,
}

impl Segment {
    /// Creates an empty segment with the given segment index.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self { index, page_table: VecMap::new() }
    }

    /// Creates an empty segment whose page table can cover `capacity` cells without reallocating.
    #[must_use]
    pub fn with_capacity(index: usize, capacity: usize) -> Self {
        Self { index, page_table: VecMap::with_capacity(capacity.div_ceil(PAGE_LEN)) }
    }

    /// The index of this segment in the VM memory.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the value of a cell, or `None` if it is still unknown.
    #[must_use]
    pub fn peek(&self, offset: u64) -> Option<&MemoryValue> {
        let (upper, lower) = Self::indices(offset).ok()?;
        self.page_table.get(upper)?.0.get(lower)
    }

    /// Reads a cell that must already be known.
    pub fn read(&self, offset: u64) -> Result<&MemoryValue, MemoryError> {
        self.peek(offset).ok_or(MemoryError::UnknownCell { offset })
    }

    /// Reads a cell that must hold a field element.
    pub fn read_felt(&self, offset: u64) -> Result<&Felt, MemoryError> {
        self.read(offset)?.felt().ok_or(MemoryError::NotAFelt { offset })
    }

    /// Assigns a value to a cell.
    ///
    /// Returns `true` if the cell was previously unknown. Writing the value a cell already holds
    /// is accepted and returns `false`.
    pub fn write(&mut self, offset: u64, value: MemoryValue) -> Result<bool, MemoryError> {
        let (upper, lower) = Self::indices(offset)?;
        let page = self.page_table.entry(upper).or_insert_with(|| Page(VecMap::new()));
        match page.0.entry(lower) {
            Entry::Occupied(entry) => {
                if *entry.get() == value {
                    Ok(false)
                } else {
                    let old = *entry.get();
                    Err(MemoryError::InconsistentWrite { offset, old, new: value })
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(true)
            }
        }
    }

    /// One past the highest known offset, or 0 for an empty segment.
    #[must_use]
    pub fn used_size(&self) -> u64 {
        self.page_table
            .iter()
            .rev()
            .find_map(|(upper, page)| page.0.keys().next_back().map(|lower| (upper, lower)))
            .map_or(0, |(upper, lower)| ((upper << LOG_PAGE_LEN) + lower) as u64 + 1)
    }

    /// The number of known cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.page_table.values().map(|page| page.0.len()).sum()
    }

    /// Returns `true` if no cell is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.page_table.values().all(|page| page.0.is_empty())
    }

    /// Breaks an offset apart into a page index and an index within the page.
    fn indices(offset: u64) -> Result<(usize, usize), MemoryError> {
        let index = usize::try_from(offset)
            .ok()
            .filter(|_| offset < MAX_SEGMENT_SIZE)
            .ok_or(MemoryError::OffsetOutOfRange { offset, max: MAX_SEGMENT_SIZE })?;
        Ok((index >> LOG_PAGE_LEN, index & PAGE_MASK))
    }
}
