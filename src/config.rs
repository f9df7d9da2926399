//! Tuning knobs loaded from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::consts::{
    DEFAULT_COMPLETION_QUEUE_CAPACITY, DEFAULT_CURRENCY_SYMBOL, DEFAULT_FEEDBACK_DURATION_MS,
    DEFAULT_FEEDBACK_TICK_MS,
};

/// Dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickAddConfig {
    /// Display duration for status messages, in milliseconds.
    pub feedback_duration_ms: u64,
    /// Symbol prefixed to amounts in status messages.
    pub currency_symbol: String,
    /// Bounded capacity of the completion channel.
    pub completion_queue_capacity: usize,
    /// How often the event loop expires on-screen messages, in milliseconds.
    pub feedback_tick_ms: u64,
}

impl Default for QuickAddConfig {
    fn default() -> Self {
        Self {
            feedback_duration_ms: DEFAULT_FEEDBACK_DURATION_MS,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            completion_queue_capacity: DEFAULT_COMPLETION_QUEUE_CAPACITY,
            feedback_tick_ms: DEFAULT_FEEDBACK_TICK_MS,
        }
    }
}

impl QuickAddConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// - `QUICKADD_FEEDBACK_DURATION_MS`: default 3000
    /// - `QUICKADD_CURRENCY_SYMBOL`: default `$`
    /// - `QUICKADD_COMPLETION_QUEUE_CAPACITY`: default 256
    /// - `QUICKADD_FEEDBACK_TICK_MS`: default 100
    #[must_use]
    pub fn from_env() -> Self {
        let currency_symbol = match std::env::var("QUICKADD_CURRENCY_SYMBOL") {
            Ok(symbol) if !symbol.trim().is_empty() => symbol.trim().to_string(),
            _ => DEFAULT_CURRENCY_SYMBOL.to_string(),
        };
        Self {
            feedback_duration_ms: env_parse("QUICKADD_FEEDBACK_DURATION_MS", DEFAULT_FEEDBACK_DURATION_MS),
            currency_symbol,
            completion_queue_capacity: env_parse(
                "QUICKADD_COMPLETION_QUEUE_CAPACITY",
                DEFAULT_COMPLETION_QUEUE_CAPACITY,
            )
            .max(1),
            feedback_tick_ms: env_parse("QUICKADD_FEEDBACK_TICK_MS", DEFAULT_FEEDBACK_TICK_MS).max(1),
        }
    }

    #[must_use]
    pub fn feedback_tick(&self) -> Duration {
        Duration::from_millis(self.feedback_tick_ms)
    }
}

/// Read `key` from the environment and parse it, or return `default`.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    parse_or(std::env::var(key).as_deref().unwrap_or(""), default)
}

fn parse_or<T>(raw: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => default,
    }
}
