//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the coroutine runtime.
//!
//! ## Environment Variables
//!
//! ### `TUNEDECK_STACK_SIZE`
//!
//! Sets the stack size for session coroutines. Accepts values in:
//! - Decimal: `16384` (16 KB)
//! - Hexadecimal: `0x4000` (16 KB)
//!
//! Default: `0x10000` (64 KB)
//!
//! Larger stacks support deeper call chains (the SQL stores go a few frames
//! deep); smaller stacks reduce memory for many concurrent sessions. Tune to
//! the handler set actually registered.

use std::env;

const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`] and apply it with
/// [`RuntimeConfig::apply()`] before the first coroutine is spawned.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for session coroutines in bytes (default: 64 KB / 0x10000)
    pub stack_size: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let stack_size = match env::var("TUNEDECK_STACK_SIZE") {
            Ok(val) => parse_stack_size(&val).unwrap_or(DEFAULT_STACK_SIZE),
            Err(_) => DEFAULT_STACK_SIZE,
        };
        RuntimeConfig { stack_size }
    }

    /// Configure the `may` scheduler: worker thread count comes from the server
    /// config, stack size from the environment. Must run before any coroutine
    /// is spawned.
    pub fn apply(&self, workers: usize) {
        may::config()
            .set_workers(workers)
            .set_stack_size(self.stack_size);
    }
}

fn parse_stack_size(val: &str) -> Option<usize> {
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex() {
        assert_eq!(parse_stack_size("16384"), Some(16384));
        assert_eq!(parse_stack_size("0x4000"), Some(0x4000));
        assert_eq!(parse_stack_size("bogus"), None);
    }
}
