use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK_MAX_BYTES: u64 = 1024 * 1024;

/// What the pipeline does when a file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the whole run on the first failure.
    FailFast,
    /// Turn failures into failed results and keep going.
    #[default]
    ContinueOnError,
}

/// Immutable per-pipeline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionOptions {
    pub max_parallelism: usize,
    pub error_policy: ErrorPolicy,
    pub fallback_max_bytes: u64,
}

impl ExtractionOptions {
    pub fn new() -> Self {
        Self {
            max_parallelism: num_cpus::get().max(1),
            error_policy: ErrorPolicy::ContinueOnError,
            fallback_max_bytes: DEFAULT_FALLBACK_MAX_BYTES,
        }
    }

    pub fn with_max_parallelism(mut self, max: usize) -> Self {
        self.max_parallelism = max.max(1);
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_fallback_max_bytes(mut self, bytes: u64) -> Self {
        self.fallback_max_bytes = bytes.max(1);
        self
    }

    pub fn is_fail_fast(&self) -> bool {
        self.error_policy == ErrorPolicy::FailFast
    }
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self::new()
    }
}
