//! Ambient configuration service.
//!
//! A thin, environment-backed snapshot used to source runtime defaults (start/stop
//! timeouts) so they can be tuned in containerized deployments without code changes. Not
//! part of the DI graph itself — the [`crate::App`] consults it directly while applying
//! defaults, before any user code runs.

use dashmap::DashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Snapshot of process environment variables, refreshable on demand.
#[derive(Clone, Default)]
pub struct ConfigService {
    values: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Build a service pre-populated from the current process environment.
    pub fn from_env() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Parse a key as milliseconds into a [`Duration`], ignoring unparsable values.
    pub fn duration_ms(&self, key: &str) -> Option<Duration> {
        self.get(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
    }
}
