//! Refinement loop configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::DEFAULT_PASSING_THRESHOLD;

/// Settings for the generate/evaluate/decide cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    /// Upper bound on generate/evaluate cycles
    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,

    /// Minimum total (0-100) for an idea to pass
    #[serde(rename = "passing-score-threshold")]
    pub passing_score_threshold: u32,

    /// Candidates requested from the generator per cycle
    #[serde(rename = "ideas-per-iteration")]
    pub ideas_per_iteration: usize,

    /// Timeout for each generator or evaluator call in milliseconds
    #[serde(rename = "call-timeout-ms")]
    pub call_timeout_ms: u64,
}

fn default_max_iterations() -> u32 {
    debug!("default_max_iterations: called");
    2
}

fn default_ideas_per_iteration() -> usize {
    debug!("default_ideas_per_iteration: called");
    3
}

fn default_call_timeout() -> u64 {
    debug!("default_call_timeout: called");
    120_000 // 2 minutes
}

impl Default for RefinementConfig {
    fn default() -> Self {
        debug!("RefinementConfig::default: called");
        Self {
            max_iterations: default_max_iterations(),
            passing_score_threshold: DEFAULT_PASSING_THRESHOLD,
            ideas_per_iteration: default_ideas_per_iteration(),
            call_timeout_ms: default_call_timeout(),
        }
    }
}

impl RefinementConfig {
    pub fn validate(&self) -> eyre::Result<()> {
        debug!(?self, "RefinementConfig::validate: called");
        if self.max_iterations == 0 {
            eyre::bail!("refinement.max-iterations must be at least 1");
        }
        if self.passing_score_threshold > 100 {
            eyre::bail!(
                "refinement.passing-score-threshold must be at most 100 (got {})",
                self.passing_score_threshold
            );
        }
        if self.ideas_per_iteration == 0 {
            eyre::bail!("refinement.ideas-per-iteration must be at least 1");
        }
        if self.call_timeout_ms == 0 {
            eyre::bail!("refinement.call-timeout-ms must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RefinementConfig::default();
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.passing_score_threshold, 70);
        assert_eq!(config.ideas_per_iteration, 3);
        assert_eq!(config.call_timeout_ms, 120_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: RefinementConfig = serde_yaml::from_str("max-iterations: 4\n").unwrap();
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.ideas_per_iteration, 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            RefinementConfig {
                max_iterations: 0,
                ..Default::default()
            },
            RefinementConfig {
                passing_score_threshold: 101,
                ..Default::default()
            },
            RefinementConfig {
                ideas_per_iteration: 0,
                ..Default::default()
            },
            RefinementConfig {
                call_timeout_ms: 0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }
}
