//! The registry of hinted signatures.

use std::collections::BTreeMap;

use num::BigUint;
use starkvm_curves::{
    ecdsa::{Signature, SignatureDecodeError, SIGNATURE_BYTES},
    utils::biguint_to_bytes_be,
    NUM_BYTES_FIELD_ELEMENT,
};
use thiserror::Error;

use super::CELLS_PER_INSTANCE;
use crate::memory::MAX_SEGMENT_SIZE;

/// The number of instances that fit in a segment, the default bound of a registry.
pub const MAX_INSTANCES: u64 = MAX_SEGMENT_SIZE / CELLS_PER_INSTANCE;

/// Errors raised while registering a signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// A component does not encode to a canonical Stark ECDSA signature.
    #[error("signature component `{name}` = {value:#x} is not in [1, n)")]
    Encoding {
        /// Either `r` or `s`.
        name: &'static str,
        /// The rejected value.
        value: BigUint,
    },

    /// The offset is not the first cell of an instance.
    #[error("offset {offset} is not the first cell of an ecdsa instance")]
    MisalignedInstance {
        /// The rejected offset.
        offset: u64,
    },

    /// The instance lies beyond the configured number of instances.
    #[error("ecdsa instance {index} is out of range, at most {max} instances are allowed")]
    InstanceOutOfRange {
        /// The instance index.
        index: u64,
        /// The maximal number of instances.
        max: u64,
    },
}

impl From<SignatureDecodeError> for SignatureError {
    fn from(err: SignatureDecodeError) -> Self {
        let SignatureDecodeError::OutOfRange { name, value } = err;
        Self::Encoding { name, value }
    }
}

/// Signatures provided by hints, keyed by instance.
///
/// Entries are stored by instance index `base / 2`, and exposed under their base offset. Only
/// instances below the bound are accepted.
#[derive(Debug, Clone)]
pub struct SignatureRegistry {
    signatures: BTreeMap<u64, Signature>,
    max_instances: u64,
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::with_max_instances(MAX_INSTANCES)
    }
}

impl SignatureRegistry {
    /// Creates a registry accepting every instance of a segment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry accepting instances `0..max_instances` only.
    #[must_use]
    pub fn with_max_instances(max_instances: u64) -> Self {
        Self { signatures: BTreeMap::new(), max_instances: max_instances.min(MAX_INSTANCES) }
    }

    /// The bound on instance indices.
    #[must_use]
    pub fn max_instances(&self) -> u64 {
        self.max_instances
    }

    /// Encodes `r` and `s` as a canonical signature and stores it for the instance at `base`.
    ///
    /// A previous signature for the same instance is replaced.
    pub fn register(&mut self, base: u64, r: &BigUint, s: &BigUint) -> Result<(), SignatureError> {
        let signature = Signature::from_bytes(&encode(r, s)?)?;
        self.insert(base, signature)?;
        Ok(())
    }

    /// Stores `signature` for the instance at `base`, returning the signature it replaces.
    pub fn insert(
        &mut self,
        base: u64,
        signature: Signature,
    ) -> Result<Option<Signature>, SignatureError> {
        if base % CELLS_PER_INSTANCE != 0 {
            return Err(SignatureError::MisalignedInstance { offset: base });
        }
        let index = base / CELLS_PER_INSTANCE;
        if index >= self.max_instances {
            return Err(SignatureError::InstanceOutOfRange { index, max: self.max_instances });
        }
        Ok(self.signatures.insert(index, signature))
    }

    /// The signature registered for the instance at `base`.
    #[must_use]
    pub fn get(&self, base: u64) -> Option<&Signature> {
        if base % CELLS_PER_INSTANCE != 0 {
            return None;
        }
        self.signatures.get(&(base / CELLS_PER_INSTANCE))
    }

    /// Iterates over `(base, signature)` pairs by increasing base.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Signature)> + '_ {
        self.signatures.iter().map(|(index, signature)| (index * CELLS_PER_INSTANCE, signature))
    }

    /// The number of registered signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Returns `true` if no signature is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Packs `r || s` as two 32-byte big-endian values.
fn encode(r: &BigUint, s: &BigUint) -> Result<[u8; SIGNATURE_BYTES], SignatureError> {
    let mut bytes = [0u8; SIGNATURE_BYTES];
    for (name, value, chunk) in
        [("r", r, 0..NUM_BYTES_FIELD_ELEMENT), ("s", s, NUM_BYTES_FIELD_ELEMENT..SIGNATURE_BYTES)]
    {
        let encoded: [u8; NUM_BYTES_FIELD_ELEMENT] = biguint_to_bytes_be(value)
            .ok_or_else(|| SignatureError::Encoding { name, value: value.clone() })?;
        bytes[chunk].copy_from_slice(&encoded);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use num::One;
    use rstest::rstest;
    use starkvm_curves::ecdsa::ec_order;

    use super::*;

    fn sig(r: u32, s: u32) -> Signature {
        Signature::new(&BigUint::from(r), &BigUint::from(s)).unwrap()
    }

    #[test]
    fn entries_are_keyed_by_base() {
        let mut registry = SignatureRegistry::new();
        assert!(registry.is_empty());
        registry.insert(6, sig(1, 2)).unwrap();
        registry.insert(0, sig(3, 4)).unwrap();

        assert_eq!(registry.get(6), Some(&sig(1, 2)));
        assert_eq!(registry.get(2), None);
        assert_eq!(registry.get(7), None);
        assert_eq!(registry.len(), 2);

        let bases: Vec<u64> = registry.iter().map(|(base, _)| base).collect();
        assert_eq!(bases, vec![0, 6]);
    }

    #[test]
    fn re_registration_overwrites() {
        let mut registry = SignatureRegistry::new();
        assert_eq!(registry.insert(2, sig(1, 2)).unwrap(), None);
        assert_eq!(registry.insert(2, sig(5, 6)).unwrap(), Some(sig(1, 2)));
        assert_eq!(registry.get(2), Some(&sig(5, 6)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_encodes_components() {
        let mut registry = SignatureRegistry::new();
        registry.register(4, &BigUint::from(9u32), &BigUint::from(10u32)).unwrap();
        assert_eq!(registry.get(4), Some(&sig(9, 10)));
    }

    #[rstest]
    #[case::r_zero(BigUint::from(0u32), BigUint::one(), "r")]
    #[case::s_zero(BigUint::one(), BigUint::from(0u32), "s")]
    #[case::r_at_order(ec_order().clone(), BigUint::one(), "r")]
    #[case::s_above_order(BigUint::one(), BigUint::one() << 255, "s")]
    #[case::s_wider_than_32_bytes(BigUint::one(), BigUint::one() << 256, "s")]
    fn register_rejects_non_canonical_components(
        #[case] r: BigUint,
        #[case] s: BigUint,
        #[case] expected: &str,
    ) {
        let mut registry = SignatureRegistry::new();
        match registry.register(0, &r, &s) {
            Err(SignatureError::Encoding { name, .. }) => assert_eq!(name, expected),
            other => panic!("expected an encoding error, got {other:?}"),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn misaligned_and_out_of_range_instances() {
        let mut registry = SignatureRegistry::with_max_instances(2);
        assert_eq!(
            registry.insert(3, sig(1, 1)),
            Err(SignatureError::MisalignedInstance { offset: 3 })
        );
        registry.insert(2, sig(1, 1)).unwrap();
        assert_eq!(
            registry.insert(4, sig(1, 1)),
            Err(SignatureError::InstanceOutOfRange { index: 2, max: 2 })
        );
        assert_eq!(registry.max_instances(), 2);
    }

    #[rstest]
    #[case::first_outside_segment(MAX_SEGMENT_SIZE, MAX_INSTANCES)]
    #[case::last_base(u64::MAX - 1, u64::MAX / 2)]
    fn default_registry_is_bounded_by_the_segment(#[case] base: u64, #[case] index: u64) {
        let mut registry = SignatureRegistry::new();
        assert_eq!(registry.max_instances(), MAX_INSTANCES);
        assert_eq!(
            registry.register(base, &BigUint::one(), &BigUint::one()),
            Err(SignatureError::InstanceOutOfRange { index, max: MAX_INSTANCES })
        );
        assert!(registry.is_empty());

        registry.register(MAX_SEGMENT_SIZE - 2, &BigUint::one(), &BigUint::one()).unwrap();
        assert_eq!(registry.iter().next().map(|(base, _)| base), Some(MAX_SEGMENT_SIZE - 2));
    }

    #[test]
    fn s_between_2_251_and_the_order_is_accepted() {
        let mut registry = SignatureRegistry::new();
        let s = (BigUint::one() << 251) + 5u32;
        registry.register(0, &BigUint::one(), &s).unwrap();
        assert_eq!(registry.get(0).map(|sig| sig.s().to_biguint()), Some(s));
    }
}
