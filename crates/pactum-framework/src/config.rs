//! Framework configuration

use pactum_crypto::DEFAULT_MAX_PROOF_DEPTH;
use serde::{Deserialize, Serialize};

/// Framework configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Maximum positions per agreement
    pub max_parties_per_agreement: usize,
    /// Maximum merkle path length accepted at join
    pub max_proof_depth: usize,
    /// Reject zero terms hashes and zero criteria roots
    pub strict_params: bool,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            max_parties_per_agreement: 256,
            max_proof_depth: DEFAULT_MAX_PROOF_DEPTH,
            strict_params: true,
        }
    }
}

impl FrameworkConfig {
    /// Create config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_parties_per_agreement: env_parse("PACTUM_MAX_PARTIES")
                .unwrap_or(defaults.max_parties_per_agreement),
            max_proof_depth: env_parse("PACTUM_MAX_PROOF_DEPTH")
                .unwrap_or(defaults.max_proof_depth),
            strict_params: env_parse("PACTUM_STRICT_PARAMS").unwrap_or(defaults.strict_params),
        }
    }

    pub fn with_max_parties(mut self, max: usize) -> Self {
        self.max_parties_per_agreement = max;
        self
    }

    pub fn with_max_proof_depth(mut self, depth: usize) -> Self {
        self.max_proof_depth = depth;
        self
    }

    pub fn with_strict_params(mut self, strict: bool) -> Self {
        self.strict_params = strict;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
