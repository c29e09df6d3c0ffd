use serde::{Deserialize, Serialize};

/// 构建状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    Idle,
    Processing,
    Complete,
    Error,
    Timeout,
    Cancelled,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BuildStatus::Idle | BuildStatus::Processing)
    }
}

/// Live counters of one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Estimated number of eligible files
    pub total: u64,
    pub processed: u64,
    pub status: BuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Retries observed so far
    #[serde(default)]
    pub retries: u32,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            total: 0,
            processed: 0,
            status: BuildStatus::Idle,
            error: None,
            retries: 0,
        }
    }
}

impl ProgressState {
    /// Fraction done in `[0, 1]`; zero while the total is unknown.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total as f64).min(1.0)
        }
    }
}
