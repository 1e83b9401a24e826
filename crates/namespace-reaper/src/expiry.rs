//! Expiry annotation parsing and evaluation

use crate::config::CycleConfig;
use std::collections::BTreeMap;
use std::num::ParseIntError;
use thiserror::Error;

/// Result of comparing a namespace's expiry annotation with the cycle's reference time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Annotation missing or empty
    NoExpiry,
    /// Expiry lies after the reference time
    NotYetDue { expires_at: i64 },
    /// Expiry is at or before the reference time
    Expired { expires_at: i64 },
}

/// The annotation value is not a base-10 `i64`. Recoverable: the namespace is skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid expiry timestamp '{value}': {source}")]
pub struct ExpiryParseError {
    pub value: String,
    #[source]
    pub source: ParseIntError,
}

/// Evaluate the expiry annotation against `config.reference_time`.
///
/// The boundary is inclusive: a value equal to the reference time is expired.
pub fn evaluate(
    annotations: &BTreeMap<String, String>,
    config: &CycleConfig,
) -> Result<Expiry, ExpiryParseError> {
    if config.annotation_key.is_empty() {
        return Ok(Expiry::NoExpiry);
    }

    let raw = match annotations.get(&config.annotation_key) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(Expiry::NoExpiry),
    };

    let expires_at = raw.parse::<i64>().map_err(|source| ExpiryParseError {
        value: raw.clone(),
        source,
    })?;

    if expires_at <= config.reference_time {
        Ok(Expiry::Expired { expires_at })
    } else {
        Ok(Expiry::NotYetDue { expires_at })
    }
}
