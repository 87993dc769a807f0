//! Engine configuration.
//!
//! Carries the ordered endpoint candidate list (dev endpoints first, one
//! optional production fallback behind a flag) and the fetch tunables.
//! Window size and prefetch threshold are deliberately configuration,
//! not constants: the defaults (5 and 2) match the shipping app but
//! nothing in the engine assumes those exact values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default development server, reachable over `adb reverse` during
/// USB debugging.
const DEFAULT_DEV_URL: &str = "http://localhost:10000";

/// Fixed fallback candidates: Android emulator loopback, host loopback,
/// and the LAN address used for wireless debugging.
const FALLBACK_CANDIDATES: [&str; 3] = [
    "http://10.0.2.2:10000",
    "http://127.0.0.1:10000",
    "http://192.168.1.64:10000",
];

/// Per-request timeout. The app uses 7–10s depending on the call site;
/// 10s is the upper bound.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Serials fetched per batch window.
const DEFAULT_WINDOW_SIZE: u32 = 5;

/// Distance from the end of the visible list that triggers look-ahead
/// prefetch of the next window.
const DEFAULT_PREFETCH_THRESHOLD: usize = 2;

/// Attempts for the initial window load of a brand-new scope, with
/// `2^attempt`-second backoff between them.
const DEFAULT_INITIAL_LOAD_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Development server, probed before everything else.
    pub dev_url: Option<String>,
    /// Production server, only probed when `use_production_fallback`.
    pub production_url: Option<String>,
    pub use_production_fallback: bool,
    pub request_timeout_secs: u64,
    pub window_size: u32,
    pub prefetch_threshold: usize,
    pub initial_load_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dev_url: Some(DEFAULT_DEV_URL.to_string()),
            production_url: None,
            use_production_fallback: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            window_size: DEFAULT_WINDOW_SIZE,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            initial_load_attempts: DEFAULT_INITIAL_LOAD_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Build a config from the environment, loading a `.env` file when
    /// present. Unset variables keep their defaults.
    ///
    /// Recognized variables: `REELCACHE_DEV_URL`, `REELCACHE_PROD_URL`,
    /// `REELCACHE_USE_PROD_FALLBACK`, `REELCACHE_TIMEOUT_SECS`,
    /// `REELCACHE_WINDOW_SIZE`, `REELCACHE_PREFETCH_THRESHOLD`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(url) = std::env::var("REELCACHE_DEV_URL") {
            if !url.trim().is_empty() {
                config.dev_url = Some(url);
            }
        }
        if let Ok(url) = std::env::var("REELCACHE_PROD_URL") {
            if !url.trim().is_empty() {
                config.production_url = Some(url);
            }
        }
        if let Ok(flag) = std::env::var("REELCACHE_USE_PROD_FALLBACK") {
            config.use_production_fallback = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Ok(Ok(secs)) = std::env::var("REELCACHE_TIMEOUT_SECS").map(|v| v.parse()) {
            config.request_timeout_secs = secs;
        }
        if let Ok(Ok(size)) = std::env::var("REELCACHE_WINDOW_SIZE").map(|v| v.parse()) {
            config.window_size = size;
        }
        if let Ok(Ok(threshold)) = std::env::var("REELCACHE_PREFETCH_THRESHOLD").map(|v| v.parse())
        {
            config.prefetch_threshold = threshold;
        }

        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Ordered candidate base URLs: dev server, fixed fallbacks, then
    /// the production server when the fallback flag allows it. Trailing
    /// slashes are stripped and duplicates removed.
    pub fn candidates(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        let mut push = |url: &str| {
            let trimmed = url.trim().trim_end_matches('/').to_string();
            if !trimmed.is_empty() && !out.contains(&trimmed) {
                out.push(trimmed);
            }
        };

        if let Some(ref dev) = self.dev_url {
            push(dev);
        }
        for fallback in FALLBACK_CANDIDATES {
            push(fallback);
        }
        if self.use_production_fallback {
            if let Some(ref prod) = self.production_url {
                push(prod);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidates_start_with_dev_server() {
        let config = EngineConfig::default();
        let candidates = config.candidates();
        assert_eq!(candidates[0], "http://localhost:10000");
        assert!(candidates.contains(&"http://10.0.2.2:10000".to_string()));
    }

    #[test]
    fn production_is_gated_by_flag() {
        let mut config = EngineConfig {
            production_url: Some("https://templates.example.com/".to_string()),
            ..Default::default()
        };

        config.use_production_fallback = false;
        assert!(!config
            .candidates()
            .contains(&"https://templates.example.com".to_string()));

        config.use_production_fallback = true;
        let candidates = config.candidates();
        // Production goes last, with the trailing slash stripped.
        assert_eq!(
            candidates.last().map(String::as_str),
            Some("https://templates.example.com")
        );
    }

    #[test]
    fn duplicate_urls_are_collapsed() {
        let config = EngineConfig {
            dev_url: Some("http://127.0.0.1:10000/".to_string()),
            ..Default::default()
        };
        let candidates = config.candidates();
        assert_eq!(
            candidates
                .iter()
                .filter(|c| *c == "http://127.0.0.1:10000")
                .count(),
            1
        );
    }
}
