//! Review pipeline configuration.
//!
//! Env variables (defaults in parentheses):
//! - `DOC_REVIEW_CHUNK_THRESHOLD_TOKENS` (4000): above this, review in chunks
//! - `DOC_REVIEW_MAX_CHUNK_TOKENS` (1500)
//! - `DOC_REVIEW_CHUNK_OVERLAP_TOKENS` (64)
//! - `DOC_REVIEW_MIN_CHUNK_CHARS` (50)
//! - `DOC_REVIEW_MAX_ATTEMPTS` (2): tries per request, first one included
//! - `DOC_REVIEW_RETRY_BACKOFF_MS` (500): multiplied by the attempt number
//! - `DOC_REVIEW_REQUEST_TIMEOUT_SECS` (120)
//! - `DOC_REVIEW_SUMMARY_MAX_TOKENS` (6000)
//! - `DOC_REVIEW_DEDUP` (`off`): `off` | `excerpt`

use std::str::FromStr;
use std::time::Duration;

use crate::chunker::ChunkParams;
use crate::errors::ConfigError;

use super::policy::DedupPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    pub chunk_threshold_tokens: usize,
    pub chunk: ChunkParams,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
    pub summary_max_tokens: usize,
    pub dedup: DedupPolicy,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_tokens: 4000,
            chunk: ChunkParams::default(),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(120),
            summary_max_tokens: 6000,
            dedup: DedupPolicy::Off,
        }
    }
}

impl ReviewConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Reads variables through `lookup`; unset variables take defaults.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidNumber`] for unparsable numbers
    /// - [`ConfigError::OutOfRange`] for a zero chunk budget, an overlap not
    ///   below the budget, or zero attempts
    /// - [`ConfigError::InvalidValue`] for an unknown dedup policy
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let num = |var: &'static str, default: usize| parse_or(&lookup, var, default);

        let chunk = ChunkParams {
            max_chunk_tokens: num("DOC_REVIEW_MAX_CHUNK_TOKENS", d.chunk.max_chunk_tokens)?,
            overlap_tokens: num("DOC_REVIEW_CHUNK_OVERLAP_TOKENS", d.chunk.overlap_tokens)?,
            min_chunk_chars: num("DOC_REVIEW_MIN_CHUNK_CHARS", d.chunk.min_chunk_chars)?,
        };
        if chunk.max_chunk_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_chunk_tokens",
                detail: "must be greater than zero",
            });
        }
        if chunk.overlap_tokens >= chunk.max_chunk_tokens {
            return Err(ConfigError::OutOfRange {
                field: "overlap_tokens",
                detail: "must be smaller than max_chunk_tokens",
            });
        }

        let max_attempts = parse_or(&lookup, "DOC_REVIEW_MAX_ATTEMPTS", d.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_attempts",
                detail: "must be at least 1",
            });
        }

        let dedup = match lookup("DOC_REVIEW_DEDUP") {
            Some(v) => v.parse()?,
            None => d.dedup,
        };

        Ok(Self {
            chunk_threshold_tokens: num("DOC_REVIEW_CHUNK_THRESHOLD_TOKENS", d.chunk_threshold_tokens)?,
            chunk,
            max_attempts,
            retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "DOC_REVIEW_RETRY_BACKOFF_MS",
                d.retry_backoff.as_millis() as u64,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DOC_REVIEW_REQUEST_TIMEOUT_SECS",
                d.request_timeout.as_secs(),
            )?),
            summary_max_tokens: num("DOC_REVIEW_SUMMARY_MAX_TOKENS", d.summary_max_tokens)?,
            dedup,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            var,
            reason: "expected a non-negative integer",
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ReviewConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ReviewConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = ReviewConfig::from_lookup(lookup(&[
            ("DOC_REVIEW_MAX_CHUNK_TOKENS", "800"),
            ("DOC_REVIEW_CHUNK_OVERLAP_TOKENS", "0"),
            ("DOC_REVIEW_RETRY_BACKOFF_MS", "10"),
            ("DOC_REVIEW_DEDUP", "excerpt"),
        ]))
        .unwrap();
        assert_eq!(cfg.chunk.max_chunk_tokens, 800);
        assert_eq!(cfg.chunk.overlap_tokens, 0);
        assert_eq!(cfg.retry_backoff, Duration::from_millis(10));
        assert_eq!(cfg.dedup, DedupPolicy::SameExcerpt);
    }

    #[test]
    fn rejects_bad_numbers_and_ranges() {
        let err = ReviewConfig::from_lookup(lookup(&[("DOC_REVIEW_MAX_ATTEMPTS", "two")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: "DOC_REVIEW_MAX_ATTEMPTS", .. }));

        let err = ReviewConfig::from_lookup(lookup(&[
            ("DOC_REVIEW_MAX_CHUNK_TOKENS", "64"),
            ("DOC_REVIEW_CHUNK_OVERLAP_TOKENS", "64"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "overlap_tokens", .. }));

        let err = ReviewConfig::from_lookup(lookup(&[("DOC_REVIEW_MAX_ATTEMPTS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "max_attempts", .. }));
    }
}
