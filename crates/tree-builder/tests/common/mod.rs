#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use repotree_builder::{
    CancellationToken, EngineConfig, QuotaInfo, RemoteEntry, RemoteSource, SourceRef, TreeError,
};

pub const REPO: &str = "https://github.com/octo/demo";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config with a short inter-group pause so paused-clock tests stay readable.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        batch_pause: Duration::from_millis(10),
        ..EngineConfig::default()
    }
}

fn parent_of(path: &str) -> String {
    path.rsplit_once('/').map(|(p, _)| p.to_string()).unwrap_or_default()
}

/// In-memory repository with call counters.
pub struct MockRepo {
    dirs: HashMap<String, Vec<RemoteEntry>>,
    contents: HashMap<String, String>,
    quota: Option<QuotaInfo>,
    authenticated: bool,
    latency: Duration,
    /// path -> failures still to serve before answering
    flaky: Mutex<HashMap<String, u32>>,
    cancel_on_list: Mutex<Option<(usize, CancellationToken)>>,
    pub list_calls: Mutex<Vec<String>>,
    pub content_calls: Mutex<Vec<String>>,
    pub rate_limit_calls: AtomicUsize,
    pub calls_after_cancel: AtomicUsize,
}

impl MockRepo {
    pub fn new() -> Self {
        let mut dirs = HashMap::new();
        dirs.insert(String::new(), Vec::new());
        Self {
            dirs,
            contents: HashMap::new(),
            quota: Some(QuotaInfo {
                limit: 5000,
                remaining: 4999,
                reset_at: 1_700_000_000,
            }),
            authenticated: false,
            latency: Duration::ZERO,
            flaky: Mutex::new(HashMap::new()),
            cancel_on_list: Mutex::new(None),
            list_calls: Mutex::new(Vec::new()),
            content_calls: Mutex::new(Vec::new()),
            rate_limit_calls: AtomicUsize::new(0),
            calls_after_cancel: AtomicUsize::new(0),
        }
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.ensure_dir(path);
        self
    }

    fn ensure_dir(&mut self, path: &str) {
        if path.is_empty() || self.dirs.contains_key(path) {
            return;
        }
        let parent = parent_of(path);
        self.ensure_dir(&parent);
        self.dirs.get_mut(&parent).unwrap().push(RemoteEntry::dir(path));
        self.dirs.insert(path.to_string(), Vec::new());
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self = self.sized_file(path, content.len() as u64);
        self.contents.insert(path.to_string(), content.to_string());
        self
    }

    /// A file whose content is not served.
    pub fn sized_file(mut self, path: &str, size: u64) -> Self {
        let parent = parent_of(path);
        self.ensure_dir(&parent);
        self.dirs.get_mut(&parent).unwrap().push(RemoteEntry::file(path, size));
        self
    }

    pub fn quota(mut self, quota: Option<QuotaInfo>) -> Self {
        self.quota = quota;
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn flaky(self, path: &str, failures: u32) -> Self {
        self.flaky.lock().unwrap().insert(path.to_string(), failures);
        self
    }

    /// Cancels `token` while serving the `n`-th listing call.
    pub fn cancel_on_list(self, n: usize, token: CancellationToken) -> Self {
        *self.cancel_on_list.lock().unwrap() = Some((n, token));
        self
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }

    pub fn listed(&self, path: &str) -> usize {
        self.list_calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn content_count(&self) -> usize {
        self.content_calls.lock().unwrap().len()
    }

    fn observe_cancelled(&self) {
        let trigger = self.cancel_on_list.lock().unwrap();
        if let Some((_, token)) = trigger.as_ref() {
            if token.is_cancelled() {
                self.calls_after_cancel.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

impl RemoteSource for MockRepo {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn rate_limit(&self) -> Result<QuotaInfo, TreeError> {
        self.rate_limit_calls.fetch_add(1, Ordering::SeqCst);
        self.quota
            .ok_or_else(|| TreeError::TransientNetwork("rate limit endpoint unavailable".into()))
    }

    async fn list_dir(&self, _source: &SourceRef, path: &str) -> Result<Vec<RemoteEntry>, TreeError> {
        self.observe_cancelled();
        let n = {
            let mut calls = self.list_calls.lock().unwrap();
            calls.push(path.to_string());
            calls.len()
        };
        if let Some((at, token)) = self.cancel_on_list.lock().unwrap().as_ref() {
            if *at == n {
                token.cancel();
            }
        }

        let fail = {
            let mut flaky = self.flaky.lock().unwrap();
            match flaky.get_mut(path) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if fail {
            return Err(TreeError::TransientNetwork(format!("reset while listing {:?}", path)));
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| TreeError::NotFound(path.to_string()))
    }

    async fn fetch_content(&self, _source: &SourceRef, path: &str) -> Result<String, TreeError> {
        self.observe_cancelled();
        self.content_calls.lock().unwrap().push(path.to_string());
        self.contents
            .get(path)
            .cloned()
            .ok_or_else(|| TreeError::NotFound(path.to_string()))
    }
}
