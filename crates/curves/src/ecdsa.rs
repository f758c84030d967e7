//! ECDSA over the Stark curve.
//!
//! `r` and `s` are scalars in `[1, n)`, where `n` is [`EC_ORDER`](crate::EC_ORDER), and the message
//! hash is any field element. With `w = s^-1 mod n`, a signature is valid iff the x-coordinate of
//! `(msg * w) * G + (r * w) * Q`, reduced modulo `n`, equals `r`.

use std::fmt;

use num::{BigUint, Zero};
use thiserror::Error;

use crate::{
    utils::memo_big_uint_str, AffinePoint, Felt, ProjectivePoint, EC_ORDER_MODULUS, GENERATOR,
    NUM_BYTES_FIELD_ELEMENT,
};

/// The number of bytes in the canonical `r || s` encoding of a signature.
pub const SIGNATURE_BYTES: usize = 2 * NUM_BYTES_FIELD_ELEMENT;

/// The order `n` of the curve generator.
pub fn ec_order() -> &'static BigUint {
    memo_big_uint_str!("800000000000010ffffffffffffffffb781126dcae7b2321e66a241adc64d2f", 16)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureDecodeError {
    #[error("signature component `{name}` = {value:#x} is outside of [1, n)")]
    OutOfRange { name: &'static str, value: BigUint },
}

/// A signature `(r, s)` with both components in `[1, n)`.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    r: Felt,
    s: Felt,
    w: Felt,
}

impl Signature {
    /// Builds a signature from its components, checking that both are in range.
    pub fn new(r: &BigUint, s: &BigUint) -> Result<Self, SignatureDecodeError> {
        let r = scalar("r", r)?;
        let s = scalar("s", s)?;
        let w = s.mod_inverse(&EC_ORDER_MODULUS).ok_or_else(|| {
            SignatureDecodeError::OutOfRange { name: "s", value: s.to_biguint() }
        })?;
        Ok(Self { r, s, w })
    }

    /// Decodes the canonical encoding: 32-byte big-endian `r` followed by 32-byte big-endian `s`.
    pub fn from_bytes(bytes: &[u8; SIGNATURE_BYTES]) -> Result<Self, SignatureDecodeError> {
        let (r, s) = bytes.split_at(NUM_BYTES_FIELD_ELEMENT);
        Self::new(&BigUint::from_bytes_be(r), &BigUint::from_bytes_be(s))
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_BYTES] {
        let mut bytes = [0u8; SIGNATURE_BYTES];
        bytes[..NUM_BYTES_FIELD_ELEMENT].copy_from_slice(&self.r.to_bytes_be());
        bytes[NUM_BYTES_FIELD_ELEMENT..].copy_from_slice(&self.s.to_bytes_be());
        bytes
    }

    #[must_use]
    pub fn r(&self) -> Felt {
        self.r
    }

    #[must_use]
    pub fn s(&self) -> Felt {
        self.s
    }

    /// `s^-1` modulo the order of the curve generator.
    #[must_use]
    pub fn w(&self) -> Felt {
        self.w
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("r", &format_args!("{:#x}", self.r))
            .field("s", &format_args!("{:#x}", self.s))
            .finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}

fn scalar(name: &'static str, value: &BigUint) -> Result<Felt, SignatureDecodeError> {
    if value.is_zero() || value >= ec_order() {
        return Err(SignatureDecodeError::OutOfRange { name, value: value.clone() });
    }
    Ok(Felt::from(value))
}

fn generator() -> ProjectivePoint {
    ProjectivePoint::from_affine_unchecked(GENERATOR.x(), GENERATOR.y())
}

/// Verifies `signature` on `message` against the full public key point.
#[must_use]
pub fn verify(public_key: &AffinePoint, message: &Felt, signature: &Signature) -> bool {
    let u1 = message.mul_mod(&signature.w, &EC_ORDER_MODULUS);
    let u2 = signature.r.mul_mod(&signature.w, &EC_ORDER_MODULUS);

    let key = ProjectivePoint::from_affine_unchecked(public_key.x(), public_key.y());
    let sum = &(&generator() * u1) + &(&key * u2);
    sum.to_affine().is_ok_and(|point| point.x().mod_floor(&EC_ORDER_MODULUS) == signature.r)
}

/// The public key `private_key * G`, or `None` for a private key that is a multiple of the order.
#[must_use]
pub fn public_key(private_key: &Felt) -> Option<AffinePoint> {
    (&generator() * *private_key).to_affine().ok()
}

#[cfg(test)]
mod tests {
    use num::One;
    use rand::{thread_rng, Rng};
    use rstest::rstest;

    use super::*;
    use crate::EC_ORDER;

    fn from_hex(s: &str) -> BigUint {
        BigUint::parse_bytes(s.as_bytes(), 16).unwrap()
    }

    fn felt(s: &str) -> Felt {
        Felt::from(from_hex(s.trim_start_matches("0x")))
    }

    const R: &str = "411494b501a98abd8262b0da1351e17899a0c4ef23dd2f96fec5ba847310b20";

    /// Private key 1, message 2, nonce 3.
    fn reference_signature() -> Signature {
        Signature::new(
            &from_hex(R),
            &from_hex("405c3191ab3883ef2b763af35bc5f5d15b3b4e99461d70e84c654a351a7c81b"),
        )
        .unwrap()
    }

    #[test]
    fn verify_reference_vector() {
        let key = public_key(&Felt::ONE).unwrap();
        assert_eq!(key, GENERATOR);
        assert!(verify(&key, &Felt::TWO, &reference_signature()));
        assert!(!verify(&key, &Felt::THREE, &reference_signature()));
        assert!(!verify(&-&key, &Felt::TWO, &reference_signature()));
    }

    #[test]
    fn public_key_of_the_order_is_infinity() {
        assert!(public_key(&EC_ORDER).is_none());
    }

    #[test]
    fn s_above_2_251_verifies() {
        // Nonce 3 and message 2, with the private key solved for s = 2^251 + 5.
        let key = AffinePoint::new(
            felt("0x65e88ecf6c2c41cdcf09c5b00d99069b91193d7dbb0b6e6e7c278bda2423d53"),
            felt("0x52127cbcb3b5f2e0a02572b9180d1e2698d3e3669af7be14b2ebd3a096ed231"),
        )
        .unwrap();
        let s = (BigUint::one() << 251) + 5u32;
        let sig = Signature::new(&from_hex(R), &s).unwrap();
        assert!(verify(&key, &Felt::TWO, &sig));
        assert!(!verify(&-&key, &Felt::TWO, &sig));
    }

    #[test]
    fn message_above_2_251_verifies() {
        let message = felt("0x800000000000000000000000000000000000000000000000000000000000007");
        let sig = Signature::new(
            &from_hex(R),
            &from_hex("405c3191ab38839480cb9048b11b4b28333596fa6149ba87aa41e8d6d10590d"),
        )
        .unwrap();
        assert!(verify(&GENERATOR, &message, &sig));
        assert!(!verify(&GENERATOR, &(message + Felt::ONE), &sig));
    }

    #[test]
    fn verify_doubles_equal_summands() {
        // With Q = G and a message equal to r, both summands are (r * w) * G.
        let sig = Signature::new(
            &from_hex(R),
            &from_hex("2b630dce011bb1d3ac41cb3c0ce140fb1115d89f6d3e1fb9ff2e7c584cb5cc0"),
        )
        .unwrap();
        assert!(verify(&GENERATOR, &felt(R), &sig));
    }

    #[test]
    fn verify_agrees_with_starknet_crypto() {
        let mut rng = thread_rng();
        let mut below_2_250 = || {
            let mut bytes: [u8; 32] = rng.gen();
            bytes[0] &= 0x03;
            Felt::from_bytes_be(&bytes)
        };
        for _ in 0..4 {
            let private_key = below_2_250() + Felt::ONE;
            let message = below_2_250();
            let sig = loop {
                if let Ok(sig) = starknet_crypto::sign(&private_key, &message, &below_2_250()) {
                    break sig;
                }
            };
            let key = public_key(&private_key).unwrap();
            let signature = Signature::new(&sig.r.to_biguint(), &sig.s.to_biguint()).unwrap();

            assert!(matches!(
                starknet_crypto::verify(&key.x(), &message, &sig.r, &sig.s),
                Ok(true)
            ));
            assert!(verify(&key, &message, &signature));
            assert!(!verify(&key, &(message + Felt::ONE), &signature));
        }
    }

    #[test]
    fn bytes_roundtrip_reference_signature() {
        let sig = reference_signature();
        assert_eq!(Signature::from_bytes(&sig.to_bytes()).unwrap(), sig);
        assert_eq!(
            sig.to_string(),
            "0x0411494b501a98abd8262b0da1351e17899a0c4ef23dd2f96fec5ba847310b20\
             0405c3191ab3883ef2b763af35bc5f5d15b3b4e99461d70e84c654a351a7c81b"
        );
    }

    #[test]
    fn w_is_inverse_modulo_group_order() {
        let sig = reference_signature();
        let product = (sig.s().to_biguint() * sig.w().to_biguint()) % ec_order();
        assert_eq!(product, BigUint::one());
        assert_eq!(
            sig.w(),
            felt("0x1ce0310e48aa17f713cbd8f8acc5a88703a359d2ef27d33ef95b8cfce4bcc91")
        );
        assert_eq!(ec_order(), &EC_ORDER.to_biguint());
    }

    #[rstest]
    #[case::zero_r(BigUint::zero(), BigUint::one(), "r")]
    #[case::zero_s(BigUint::one(), BigUint::zero(), "s")]
    #[case::r_at_order(ec_order().clone(), BigUint::one(), "r")]
    #[case::s_at_order(BigUint::one(), ec_order().clone(), "s")]
    #[case::s_above_field(BigUint::one(), BigUint::one() << 255, "s")]
    fn out_of_range_components_are_rejected(
        #[case] r: BigUint,
        #[case] s: BigUint,
        #[case] expected: &str,
    ) {
        match Signature::new(&r, &s) {
            Err(SignatureDecodeError::OutOfRange { name, .. }) => assert_eq!(name, expected),
            other => panic!("expected an out-of-range error, got {other:?}"),
        }
    }

    #[test]
    fn largest_scalars_are_accepted() {
        let max = ec_order() - 1u32;
        let sig = Signature::new(&max, &max).unwrap();
        assert_eq!(sig.r().to_biguint(), max);
        assert_eq!(Signature::from_bytes(&sig.to_bytes()), Ok(sig));
    }
}
