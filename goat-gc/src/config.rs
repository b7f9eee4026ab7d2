use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Error};

/// Name of the environment variable overriding `GcParams::threshold`.
pub const THRESHOLD_VAR: &str = "GOAT_GC_THRESHOLD";
/// Name of the environment variable overriding `GcParams::used_space_ratio`.
pub const USED_SPACE_RATIO_VAR: &str = "GOAT_GC_USED_SPACE_RATIO";

/// Tuning of the automatic collection trigger (`Registry::maybe_collect_garbage`).
#[derive(Debug, Clone, PartialEq)]
pub struct GcParams {
    /// Number of live dynamic objects above which a collection cycle is run.
    pub threshold: usize,
    /// After a cycle, if more than this fraction of the threshold is still live,
    /// the threshold grows so that the live objects occupy exactly this fraction.
    pub used_space_ratio: f64,
}

impl Default for GcParams {
    fn default() -> Self {
        Self {
            threshold: 100_000,
            used_space_ratio: 0.7,
        }
    }
}

impl GcParams {
    /// Reads the parameters from the process environment, falling back to the defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Reads the parameters through the given variable lookup, falling back to the defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut params = Self::default();

        if let Some(threshold) = parse_var(&lookup, THRESHOLD_VAR)? {
            params.threshold = threshold;
        }
        if let Some(ratio) = parse_var::<f64>(&lookup, USED_SPACE_RATIO_VAR)? {
            if !(ratio > 0.0 && ratio <= 1.0) {
                bail!(
                    "`{}` must be within (0, 1], got {}",
                    USED_SPACE_RATIO_VAR,
                    ratio
                );
            }
            params.used_space_ratio = ratio;
        }

        Ok(params)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for `{}`: {:?}", name, raw)),
        None => Ok(None),
    }
}
