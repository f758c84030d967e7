//! Builtin options, with overrides from the environment.

use tracing::warn;

const DEFAULT_ECDSA_RATIO: u64 = 512;

/// Options for the builtins of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinOpts {
    /// VM steps per ecdsa instance, or `None` for a dynamic layout.
    pub ecdsa_ratio: Option<u64>,
    /// The maximal number of ecdsa instances signatures can be registered for. `None` keeps
    /// the default, one segment worth of instances.
    pub max_ecdsa_instances: Option<u64>,
}

impl Default for BuiltinOpts {
    fn default() -> Self {
        Self { ecdsa_ratio: Some(DEFAULT_ECDSA_RATIO), max_ecdsa_instances: None }
    }
}

impl BuiltinOpts {
    /// The default options, overridden by `ECDSA_BUILTIN_RATIO` and `ECDSA_MAX_INSTANCES`.
    #[must_use]
    pub fn from_env() -> Self {
        Self { ecdsa_ratio: ecdsa_ratio(), max_ecdsa_instances: max_ecdsa_instances() }
    }
}

/// Gets the ecdsa ratio. `dynamic` selects the dynamic layout.
fn ecdsa_ratio() -> Option<u64> {
    match std::env::var("ECDSA_BUILTIN_RATIO") {
        Ok(val) => parse_ratio(&val).unwrap_or_else(|| {
            warn!("invalid ECDSA_BUILTIN_RATIO {val:?}, using {DEFAULT_ECDSA_RATIO}");
            Some(DEFAULT_ECDSA_RATIO)
        }),
        Err(_) => Some(DEFAULT_ECDSA_RATIO),
    }
}

/// Gets the bound on ecdsa instances.
fn max_ecdsa_instances() -> Option<u64> {
    match std::env::var("ECDSA_MAX_INSTANCES") {
        Ok(val) => match val.trim().parse() {
            Ok(max) => Some(max),
            Err(_) => {
                warn!("invalid ECDSA_MAX_INSTANCES {val:?}, ignoring it");
                None
            }
        },
        Err(_) => None,
    }
}

/// Parses a ratio setting: `Some(None)` for `dynamic`, `None` if it cannot be parsed.
fn parse_ratio(val: &str) -> Option<Option<u64>> {
    let val = val.trim();
    if val.eq_ignore_ascii_case("dynamic") {
        return Some(None);
    }
    val.parse().ok().map(Some)
}

#[cfg(test)]
mod tests {
    use std::{env, sync::Mutex};

    use rstest::rstest;

    use super::*;

    /// Serializes the tests touching the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[rstest]
    #[case("256", Some(Some(256)))]
    #[case(" 8 ", Some(Some(8)))]
    #[case("dynamic", Some(None))]
    #[case("Dynamic", Some(None))]
    #[case("-1", None)]
    #[case("", None)]
    fn ratio_settings(#[case] val: &str, #[case] expected: Option<Option<u64>>) {
        assert_eq!(parse_ratio(val), expected);
    }

    #[test]
    fn default_opts() {
        let opts = BuiltinOpts::default();
        assert_eq!(opts.ecdsa_ratio, Some(512));
        assert_eq!(opts.max_ecdsa_instances, None);
    }

    #[rstest]
    #[case::unset(None, None, BuiltinOpts::default())]
    #[case::ratio(
        Some("256"),
        None,
        BuiltinOpts { ecdsa_ratio: Some(256), max_ecdsa_instances: None }
    )]
    #[case::dynamic(
        Some("dynamic"),
        Some("16"),
        BuiltinOpts { ecdsa_ratio: None, max_ecdsa_instances: Some(16) }
    )]
    #[case::invalid_values_fall_back(Some("bogus"), Some("-3"), BuiltinOpts::default())]
    fn opts_from_env(
        #[case] ratio: Option<&str>,
        #[case] max_instances: Option<&str>,
        #[case] expected: BuiltinOpts,
    ) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (key, val) in [("ECDSA_BUILTIN_RATIO", ratio), ("ECDSA_MAX_INSTANCES", max_instances)] {
            match val {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }

        let opts = BuiltinOpts::from_env();

        env::remove_var("ECDSA_BUILTIN_RATIO");
        env::remove_var("ECDSA_MAX_INSTANCES");
        assert_eq!(opts, expected);
    }
}
