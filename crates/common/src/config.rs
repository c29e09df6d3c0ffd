use std::time::Duration;

use crate::TreeError;

/// Retry schedule for a single remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub call_timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_ttl: Duration,
    pub remote_batch_size: usize,
    pub local_batch_size: usize,
    pub call_timeout: Duration,
    pub build_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// Pause between two batch groups
    pub batch_pause: Duration,
    /// Files at or above this many bytes are never inlined
    pub text_size_threshold: u64,
    /// Remaining quota below which a warning is logged
    pub low_quota_threshold: u64,
    pub api_base: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            remote_batch_size: 10,
            local_batch_size: 20,
            call_timeout: Duration::from_secs(8),
            build_timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
            batch_pause: Duration::from_millis(100),
            text_size_threshold: 100 * 1024,
            low_quota_threshold: 100,
            api_base: "https://api.github.com".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            call_timeout: self.call_timeout,
            max_retries: self.max_retries,
            base_delay: self.retry_base_delay,
        }
    }

    /// Defaults overridden by `REPOTREE_*` environment variables.
    pub fn from_env() -> Result<Self, TreeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, TreeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let num = |key: &str| -> Result<Option<u64>, TreeError> {
            match lookup(key) {
                None => Ok(None),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| TreeError::Config(format!("{} must be an integer, got {:?}", key, raw))),
            }
        };

        if let Some(v) = num("REPOTREE_CACHE_TTL_SECS")? {
            cfg.cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = num("REPOTREE_REMOTE_BATCH_SIZE")? {
            cfg.remote_batch_size = narrow("REPOTREE_REMOTE_BATCH_SIZE", v)?;
        }
        if let Some(v) = num("REPOTREE_LOCAL_BATCH_SIZE")? {
            cfg.local_batch_size = narrow("REPOTREE_LOCAL_BATCH_SIZE", v)?;
        }
        if let Some(v) = num("REPOTREE_CALL_TIMEOUT_MS")? {
            cfg.call_timeout = Duration::from_millis(v);
        }
        if let Some(v) = num("REPOTREE_BUILD_TIMEOUT_SECS")? {
            cfg.build_timeout = Duration::from_secs(v);
        }
        if let Some(v) = num("REPOTREE_MAX_RETRIES")? {
            cfg.max_retries = narrow("REPOTREE_MAX_RETRIES", v)?;
        }
        if let Some(v) = num("REPOTREE_RETRY_BASE_MS")? {
            cfg.retry_base_delay = Duration::from_millis(v);
        }
        if let Some(v) = num("REPOTREE_TEXT_SIZE_THRESHOLD")? {
            cfg.text_size_threshold = v;
        }
        if let Some(base) = lookup("REPOTREE_API_BASE") {
            cfg.api_base = base.trim_end_matches('/').to_string();
        }

        if cfg.remote_batch_size == 0 || cfg.local_batch_size == 0 {
            return Err(TreeError::Config("batch sizes must be at least 1".to_string()));
        }
        Ok(cfg)
    }
}

fn narrow<T: TryFrom<u64>>(key: &str, v: u64) -> Result<T, TreeError> {
    T::try_from(v).map_err(|_| TreeError::Config(format!("{} is out of range: {}", key, v)))
}
