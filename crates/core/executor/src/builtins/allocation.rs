//! Sizing of builtin segments.
//!
//! A builtin with a ratio `r` gets one instance every `r` VM steps. A builtin without a ratio
//! (dynamic layout) is sized from its own usage, rounded up to a power of two components.

use thiserror::Error;

/// The static shape of a builtin, as far as segment sizing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinLayout {
    /// The builtin name, for diagnostics.
    pub name: &'static str,
    /// VM steps per builtin instance, or `None` for a dynamic layout.
    pub ratio: Option<u64>,
    /// How many of the cells of an instance are inputs.
    pub input_cells_per_instance: u64,
    /// How many instances are grouped in a single component.
    pub instances_per_component: u64,
    /// How many memory cells an instance spans.
    pub cells_per_instance: u64,
}

/// Errors raised while sizing a builtin segment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizingError {
    /// The run is too short to contain even one component.
    #[error("builtin `{builtin}` needs at least {min_steps} steps, the run has {steps}")]
    InsufficientSteps {
        /// The builtin name.
        builtin: &'static str,
        /// The minimal number of steps.
        min_steps: u64,
        /// The number of steps of the run.
        steps: u64,
    },

    /// The builtin used more cells than the layout allocates to it.
    #[error("builtin `{builtin}` used {used} cells but only {allocated} were allocated")]
    InsufficientAllocatedCells {
        /// The builtin name.
        builtin: &'static str,
        /// The used cells.
        used: u64,
        /// The allocated cells.
        allocated: u64,
    },

    /// The layout declares a ratio of zero.
    #[error("builtin `{builtin}` has a ratio of zero")]
    ZeroRatio {
        /// The builtin name.
        builtin: &'static str,
    },
}

/// Computes how many cells a builtin segment occupies in the final trace.
pub trait AllocationPolicy {
    /// Returns the allocated size of a segment with `used` cells after `step_count` VM steps.
    ///
    /// The result is never below `used`.
    fn allocated_size(
        &self,
        layout: &BuiltinLayout,
        used: u64,
        step_count: u64,
    ) -> Result<u64, SizingError>;
}

/// The allocation formula shared by all builtins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioAllocation;

impl AllocationPolicy for RatioAllocation {
    fn allocated_size(
        &self,
        layout: &BuiltinLayout,
        used: u64,
        step_count: u64,
    ) -> Result<u64, SizingError> {
        match layout.ratio {
            Some(0) => Err(SizingError::ZeroRatio { builtin: layout.name }),
            Some(ratio) => {
                let min_steps = ratio.saturating_mul(layout.instances_per_component);
                if step_count < min_steps {
                    return Err(SizingError::InsufficientSteps {
                        builtin: layout.name,
                        min_steps,
                        steps: step_count,
                    });
                }
                let allocated = layout.cells_per_instance * (step_count / ratio);
                if used > allocated {
                    return Err(SizingError::InsufficientAllocatedCells {
                        builtin: layout.name,
                        used,
                        allocated,
                    });
                }
                Ok(allocated)
            }
            None => {
                let instances = used.div_ceil(layout.cells_per_instance);
                let components = match instances.div_ceil(layout.instances_per_component) {
                    0 => 0,
                    n => n.next_power_of_two(),
                };
                Ok(layout.cells_per_instance * layout.instances_per_component * components)
            }
        }
    }
}
