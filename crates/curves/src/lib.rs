//! Stark curve primitives for the starkvm builtins.
//!
//! Field and point arithmetic come from `starknet-types-core`, the curve constants from
//! `starknet-curve`. This crate adds the canonical signature encoding and the verification
//! equation of the ecdsa builtin, see [`ecdsa`].

pub mod ecdsa;
pub mod utils;

pub use starknet_curve::curve_params::{ALPHA, BETA, EC_ORDER, GENERATOR};
pub use starknet_types_core::{
    curve::{AffinePoint, CurveError, ProjectivePoint},
    felt::{Felt, NonZeroFelt},
};

/// The number of bytes in the canonical big-endian encoding of a field element.
pub const NUM_BYTES_FIELD_ELEMENT: usize = 32;

/// [`EC_ORDER`] as a modulus for scalar arithmetic.
pub const EC_ORDER_MODULUS: NonZeroFelt = NonZeroFelt::from_felt_unchecked(EC_ORDER);

/// `x^3 + ALPHA * x + BETA`, the right-hand side of the curve equation.
#[must_use]
pub fn curve_rhs(x: &Felt) -> Felt {
    x * x * x + ALPHA * x + BETA
}

/// Returns `true` if `(x, y)` satisfies the curve equation.
#[must_use]
pub fn is_on_curve(x: &Felt, y: &Felt) -> bool {
    y.square() == curve_rhs(x)
}
