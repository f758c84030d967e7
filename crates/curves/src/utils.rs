use num::BigUint;

/// Big-endian encoding of `integer`, left-padded to `N` bytes. Returns `None` if it does not fit.
pub fn biguint_to_bytes_be<const N: usize>(integer: &BigUint) -> Option<[u8; N]> {
    let bytes = integer.to_bytes_be();
    if bytes.len() > N {
        return None;
    }
    let mut out = [0u8; N];
    out[N - bytes.len()..].copy_from_slice(&bytes);
    Some(out)
}

/// Memoize a BigUint from a const string, you can optionally pass a radix.
///
/// ```ignore
///     let t = memo_big_uint_str!("1234567890");
///     let t = memo_big_uint_str!("1234567890", 16);
/// ```
macro_rules! memo_big_uint_str {
    ($uint:expr, $radix:expr) => {{
        use ::num::Num;

        static _MEMO_TEMP: std::sync::OnceLock<::num::BigUint> = std::sync::OnceLock::new();

        _MEMO_TEMP.get_or_init(|| ::num::BigUint::from_str_radix($uint, $radix).unwrap())
    }};
    ($uint:expr) => {{
        use std::str::FromStr;

        static _MEMO_TEMP: std::sync::OnceLock<::num::BigUint> = std::sync::OnceLock::new();

        _MEMO_TEMP.get_or_init(|| ::num::BigUint::from_str($uint).unwrap())
    }};
}

pub(crate) use memo_big_uint_str;
