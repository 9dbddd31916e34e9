use std::{num::NonZeroUsize, time::Duration};

use crate::{
    document::DEFAULT_READ_TIMEOUT,
    error::{Error, Result},
};

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 8;

pub const TOP_K_ENV_VAR: &str = "RESUMERANK_TOP_K";
pub const WORKERS_ENV_VAR: &str = "RESUMERANK_WORKERS";
pub const READ_TIMEOUT_ENV_VAR: &str = "RESUMERANK_READ_TIMEOUT_SECS";

/// Knobs for one ranking pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingConfig {
    /// Number of candidates returned after sorting.
    pub top_k: usize,
    /// Size of the worker pool used for reading and embedding.
    pub workers: usize,
    /// Number of resumes sent to the embedding provider per call.
    pub batch_size: usize,
    /// Attach SKILL/QUALIFICATION spans to ranked candidates.
    pub extract_entities: bool,
    /// Per-document parse deadline; a resume that takes longer is skipped.
    pub read_timeout: Duration,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            batch_size: DEFAULT_BATCH_SIZE,
            extract_entities: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl RankingConfig {
    /// Defaults overridden by `RESUMERANK_TOP_K`, `RESUMERANK_WORKERS`
    /// and `RESUMERANK_READ_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(top_k) = env_usize(TOP_K_ENV_VAR)? {
            config.top_k = top_k;
        }
        if let Some(workers) = env_usize(WORKERS_ENV_VAR)? {
            config.workers = workers;
        }
        if let Some(secs) = env_usize(READ_TIMEOUT_ENV_VAR)? {
            config.read_timeout = Duration::from_secs(secs as u64);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Config("top-k must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".into()));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::Config("read timeout must be positive".into()));
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => parse_usize(name, &raw).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Config(format!("{name}: {e}"))),
    }
}

fn parse_usize(name: &str, raw: &str) -> Result<usize> {
    raw.trim().parse().map_err(|_| {
        Error::Config(format!("{name} must be a positive integer, got '{raw}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RankingConfig::default();
        assert_eq!(config.top_k, 10);
        assert!(config.workers >= 1);
        assert!(!config.extract_entities);
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        config.validate().unwrap();
    }

    #[test]
    fn zero_values_rejected() {
        let config = RankingConfig {
            top_k: 0,
            ..RankingConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = RankingConfig {
            workers: 0,
            ..RankingConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = RankingConfig {
            read_timeout: Duration::ZERO,
            ..RankingConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn parse_env_values() {
        assert_eq!(parse_usize("X", " 5 ").unwrap(), 5);
        assert!(matches!(parse_usize("X", "five"), Err(Error::Config(_))));
        assert!(matches!(parse_usize("X", "-1"), Err(Error::Config(_))));
    }
}
