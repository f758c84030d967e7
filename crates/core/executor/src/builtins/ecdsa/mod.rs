//! The ecdsa builtin.
//!
//! Every instance spans two cells, the x-coordinate of a public key followed by a message hash.
//! Signatures are registered out of band, before the instance is written. Once both cells of an
//! instance are known, the registered signature is verified against the public key, trying the
//! smaller y-coordinate first and its negation second.

pub mod air;
pub mod registry;

use num::BigUint;
use starkvm_curves::{curve_rhs, ecdsa, AffinePoint, Felt};
use thiserror::Error;
use tracing::{debug, trace};

pub use air::{EcdsaPrivateInput, EcdsaSignatureInput};
pub use registry::{SignatureError, SignatureRegistry};

use super::{
    AllocationPolicy, BuiltinError, BuiltinLayout, BuiltinRunner, CheckOutcome, RatioAllocation,
    SizingError,
};
use crate::{
    memory::{MemoryError, MemoryValue, Segment},
    opts::BuiltinOpts,
};

/// The name of the ecdsa builtin.
pub const ECDSA_BUILTIN_NAME: &str = "ecdsa";

/// The number of memory cells of an instance.
pub const CELLS_PER_INSTANCE: u64 = 2;

/// The number of input cells of an instance. Every cell of an ecdsa instance is an input.
pub const INPUT_CELLS_PER_INSTANCE: u64 = 2;

/// The number of instances in a component.
pub const INSTANCES_PER_COMPONENT: u64 = 1;

/// The offsets of the two cells of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceCells {
    /// The public key x-coordinate, at the base of the instance.
    pub pubkey: u64,
    /// The message hash.
    pub message: u64,
}

impl InstanceCells {
    /// The cells of the instance that `offset` belongs to.
    #[must_use]
    pub const fn containing(offset: u64) -> Self {
        let base = offset - offset % CELLS_PER_INSTANCE;
        Self { pubkey: base, message: base + 1 }
    }

    /// The index of the instance in the segment.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.pubkey / CELLS_PER_INSTANCE
    }
}

/// Errors raised while checking an ecdsa instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// No point of the curve has this x-coordinate.
    #[error("{x:#x} is not the x-coordinate of a point on the Stark curve")]
    InvalidPublicKey {
        /// The rejected x-coordinate.
        x: Felt,
    },

    /// The recovered public key is not on the curve.
    #[error("public key ({x:#x}, {y:#x}) is not on the Stark curve")]
    KeyNotOnCurve {
        /// The x-coordinate.
        x: Felt,
        /// The recovered y-coordinate.
        y: Felt,
    },

    /// No signature was registered for the instance.
    #[error("signature hint is missing for the ecdsa instance at offset {offset}")]
    MissingSignature {
        /// The base offset of the instance.
        offset: u64,
    },

    /// The registered signature is valid under neither y-coordinate.
    #[error("signature for the ecdsa instance at offset {offset} is invalid")]
    InvalidSignature {
        /// The base offset of the instance.
        offset: u64,
    },

    /// An instance cell could not be decoded.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Recovers both y-coordinates of the curve points with x-coordinate `x`.
///
/// The first coordinate is the smaller root as an integer, the second its negation.
pub fn recover_y(x: &Felt) -> Result<(Felt, Felt), VerificationError> {
    let y = curve_rhs(x).sqrt().ok_or(VerificationError::InvalidPublicKey { x: *x })?;
    Ok((y, -y))
}

/// The ecdsa builtin runner.
#[derive(Debug, Clone)]
pub struct EcdsaBuiltin<P = RatioAllocation> {
    layout: BuiltinLayout,
    policy: P,
    signatures: SignatureRegistry,
    stop_pointer: Option<u64>,
}

impl EcdsaBuiltin {
    /// Creates an ecdsa builtin with the given ratio, or a dynamic layout for `None`.
    #[must_use]
    pub fn new(ratio: Option<u64>) -> Self {
        Self::with_policy(ratio, RatioAllocation)
    }

    /// Creates an ecdsa builtin from the given options.
    #[must_use]
    pub fn from_opts(opts: &BuiltinOpts) -> Self {
        let builtin = Self::new(opts.ecdsa_ratio);
        match opts.max_ecdsa_instances {
            Some(max) => builtin.with_max_instances(max),
            None => builtin,
        }
    }
}

impl Default for EcdsaBuiltin {
    fn default() -> Self {
        Self::from_opts(&BuiltinOpts::default())
    }
}

impl<P: AllocationPolicy> EcdsaBuiltin<P> {
    /// Creates an ecdsa builtin whose segment is sized by `policy`.
    pub fn with_policy(ratio: Option<u64>, policy: P) -> Self {
        Self {
            layout: BuiltinLayout {
                name: ECDSA_BUILTIN_NAME,
                ratio,
                input_cells_per_instance: INPUT_CELLS_PER_INSTANCE,
                instances_per_component: INSTANCES_PER_COMPONENT,
                cells_per_instance: CELLS_PER_INSTANCE,
            },
            policy,
            signatures: SignatureRegistry::new(),
            stop_pointer: None,
        }
    }

    /// Bounds the number of instances signatures can be registered for.
    #[must_use]
    pub fn with_max_instances(mut self, max_instances: u64) -> Self {
        self.signatures = SignatureRegistry::with_max_instances(max_instances);
        self
    }

    /// The sizing layout of the builtin.
    #[must_use]
    pub fn layout(&self) -> &BuiltinLayout {
        &self.layout
    }

    /// The registered signatures.
    #[must_use]
    pub fn signatures(&self) -> &SignatureRegistry {
        &self.signatures
    }

    /// Registers the signature `(r, s)` for the instance at offset `base`.
    ///
    /// Called by the signature hint, before the instance cells are written.
    pub fn add_signature(
        &mut self,
        base: u64,
        r: &BigUint,
        s: &BigUint,
    ) -> Result<(), SignatureError> {
        self.signatures.register(base, r, s)?;
        debug!("registered ecdsa signature for the instance at offset {base}");
        Ok(())
    }

    /// Verifies the instance that `offset` belongs to, if both of its cells are known.
    pub fn verify_instance(
        &self,
        segment: &Segment,
        offset: u64,
    ) -> Result<CheckOutcome, VerificationError> {
        let cells = InstanceCells::containing(offset);
        let pubkey = segment.peek(cells.pubkey);
        let message = segment.peek(cells.message);
        let (Some(pubkey), Some(message)) = (pubkey, message) else {
            trace!("ecdsa instance at offset {} is not complete yet", cells.pubkey);
            return Ok(CheckOutcome::Pending);
        };

        let x = pubkey.felt().ok_or(MemoryError::NotAFelt { offset: cells.pubkey })?;
        let message = message.felt().ok_or(MemoryError::NotAFelt { offset: cells.message })?;

        let (y, neg_y) = recover_y(x)?;
        let key = AffinePoint::new(*x, y)
            .map_err(|_| VerificationError::KeyNotOnCurve { x: *x, y })?;

        let signature = self
            .signatures
            .get(cells.pubkey)
            .ok_or(VerificationError::MissingSignature { offset: cells.pubkey })?;

        if ecdsa::verify(&key, message, signature) {
            debug!("verified ecdsa instance at offset {} with the positive key", cells.pubkey);
            return Ok(CheckOutcome::Verified);
        }

        let key = AffinePoint::new_unchecked(*x, neg_y);
        if ecdsa::verify(&key, message, signature) {
            debug!("verified ecdsa instance at offset {} with the negative key", cells.pubkey);
            return Ok(CheckOutcome::Verified);
        }

        Err(VerificationError::InvalidSignature { offset: cells.pubkey })
    }

    /// Builds the AIR private input for every registered signature.
    pub fn export_private_inputs(
        &self,
        segment: &Segment,
    ) -> Result<Vec<EcdsaPrivateInput>, MemoryError> {
        air::export_private_inputs(&self.signatures, segment)
    }
}

impl<P: AllocationPolicy> BuiltinRunner for EcdsaBuiltin<P> {
    fn name(&self) -> &'static str {
        ECDSA_BUILTIN_NAME
    }

    fn check_write(&self, segment: &Segment, offset: u64) -> Result<CheckOutcome, BuiltinError> {
        Ok(self.verify_instance(segment, offset)?)
    }

    fn infer_value(&self, _segment: &Segment, offset: u64) -> Result<MemoryValue, BuiltinError> {
        Err(BuiltinError::CannotInfer { builtin: ECDSA_BUILTIN_NAME, offset })
    }

    fn allocated_size(&self, used: u64, step_count: u64) -> Result<u64, SizingError> {
        self.policy.allocated_size(&self.layout, used, step_count)
    }

    fn cells_per_instance(&self) -> u64 {
        CELLS_PER_INSTANCE
    }

    fn stop_pointer(&self) -> Option<u64> {
        self.stop_pointer
    }

    fn set_stop_pointer(&mut self, pointer: u64) {
        self.stop_pointer = Some(pointer);
    }
}
