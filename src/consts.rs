//! Shared defaults and labels.

// ── Commit ──────────────────────────────────────────────────────

/// Category assigned to a committed expense when its template has none.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Currency symbol used when none is configured.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";

// ── Feedback ────────────────────────────────────────────────────

/// How long a status message stays on screen, in milliseconds.
pub const DEFAULT_FEEDBACK_DURATION_MS: u64 = 3000;

/// Interval at which the event loop checks for expired messages.
pub const DEFAULT_FEEDBACK_TICK_MS: u64 = 100;

// ── Event loop ──────────────────────────────────────────────────

/// Bounded capacity of the completion channel between write tasks and the loop.
pub const DEFAULT_COMPLETION_QUEUE_CAPACITY: usize = 256;
