//! Property-test run profile read from the environment.
//!
//! `PROPTEST_CASES` overrides the case count of every suite that builds its
//! config from this profile and `FRAUDNET_PBT_FORK` toggles forked
//! execution. Invalid overrides are logged and ignored.

use std::env;

use thiserror::Error;

/// Environment variable overriding the proptest case count.
pub const PROPTEST_CASES_ENV_KEY: &str = "PROPTEST_CASES";
/// Environment variable toggling forked proptest execution.
pub const FRAUDNET_PBT_FORK_ENV_KEY: &str = "FRAUDNET_PBT_FORK";

/// Why an override could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideError {
    /// The value is not an unsigned integer.
    #[error("`{raw}` is not a case count")]
    NotANumber {
        /// Offending value.
        raw: String,
    },
    /// A run needs at least one case.
    #[error("case count must be greater than zero")]
    ZeroCases,
    /// The value is not a recognised boolean spelling.
    #[error("`{raw}` is not one of true/false/1/0/yes/no/on/off")]
    NotABool {
        /// Offending value.
        raw: String,
    },
}

/// Case count and fork policy for one property suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
}

impl ProptestRunProfile {
    /// Reads the overrides, falling back to the supplied defaults.
    ///
    /// # Examples
    /// ```
    /// use fraudnet_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(64, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        Self {
            cases: read_override(PROPTEST_CASES_ENV_KEY, parse_cases).unwrap_or(default_cases),
            fork: read_override(FRAUDNET_PBT_FORK_ENV_KEY, parse_bool).unwrap_or(default_fork),
        }
    }

    /// Cases to run per property.
    #[must_use]
    #[rustfmt::skip]
    pub fn cases(&self) -> u32 { self.cases }

    /// Whether cases run in forked subprocesses.
    #[must_use]
    #[rustfmt::skip]
    pub fn fork(&self) -> bool { self.fork }
}

fn read_override<T>(key: &'static str, parse: fn(&str) -> Result<T, OverrideError>) -> Option<T> {
    let raw = env::var(key).ok()?;
    parse(&raw)
        .inspect_err(|error| {
            tracing::warn!(env = key, %raw, %error, "ignoring property-test override");
        })
        .ok()
}

/// Parses a positive case count.
///
/// # Errors
/// Returns [`OverrideError::NotANumber`] or [`OverrideError::ZeroCases`].
pub fn parse_cases(raw: &str) -> Result<u32, OverrideError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(OverrideError::ZeroCases),
        Ok(cases) => Ok(cases),
        Err(_) => Err(OverrideError::NotANumber {
            raw: raw.to_owned(),
        }),
    }
}

/// Parses a boolean flag spelling, ignoring case and surrounding whitespace.
///
/// # Errors
/// Returns [`OverrideError::NotABool`] for unrecognised spellings.
pub fn parse_bool(raw: &str) -> Result<bool, OverrideError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OverrideError::NotABool {
            raw: raw.to_owned(),
        }),
    }
}
