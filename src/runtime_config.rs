//! # Runtime Configuration Module
//!
//! Environment variable based tuning for the coroutine runtime and the HTTP
//! reader limits.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `WAX_STACK_SIZE` | `0x10000` | Stack size of the accept and connection coroutines |
//! | `WAX_WORKERS` | runtime default | Number of `may` worker threads |
//! | `WAX_MAX_BODY_BYTES` | `10485760` | Largest accepted request body (decoded) |
//! | `WAX_MAX_HEADER_BYTES` | `65536` | Largest accepted request head |
//!
//! Sizes accept decimal (`65536`) or hexadecimal (`0x10000`). Unparseable
//! values fall back to the default.
//!
//! ## Usage
//!
//! ```rust
//! use wax_server::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use std::env;

pub const DEFAULT_STACK_SIZE: usize = 0x10000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    /// `may` worker thread count; `None` keeps the runtime default
    pub workers: Option<usize>,
    /// Maximum decoded request body size
    pub max_body_bytes: usize,
    /// Maximum request line plus headers size
    pub max_header_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let size = |key: &str, default: usize| {
            lookup(key)
                .and_then(|v| parse_size(&v))
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        RuntimeConfig {
            stack_size: size("WAX_STACK_SIZE", DEFAULT_STACK_SIZE),
            workers: lookup("WAX_WORKERS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|w: &usize| *w > 0),
            max_body_bytes: size("WAX_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            max_header_bytes: size("WAX_MAX_HEADER_BYTES", DEFAULT_MAX_HEADER_BYTES),
        }
    }

    /// Apply the coroutine settings to the global `may` runtime.
    pub fn apply_to_runtime(&self) {
        let config = may::config();
        config.set_stack_size(self.stack_size);
        if let Some(workers) = self.workers {
            config.set_workers(workers);
        }
    }
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> RuntimeConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), RuntimeConfig::default());
    }

    #[test]
    fn test_hex_and_decimal_sizes() {
        let cfg = config(&[
            ("WAX_STACK_SIZE", "0x8000"),
            ("WAX_MAX_BODY_BYTES", "2048"),
            ("WAX_MAX_HEADER_BYTES", " 0X400 "),
            ("WAX_WORKERS", "4"),
        ]);
        assert_eq!(cfg.stack_size, 0x8000);
        assert_eq!(cfg.max_body_bytes, 2048);
        assert_eq!(cfg.max_header_bytes, 0x400);
        assert_eq!(cfg.workers, Some(4));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[
            ("WAX_STACK_SIZE", "big"),
            ("WAX_MAX_BODY_BYTES", "0"),
            ("WAX_WORKERS", "0"),
        ]);
        assert_eq!(cfg.stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(cfg.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(cfg.workers, None);
    }
}
