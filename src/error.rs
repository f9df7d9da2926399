//! Stable error codes for the component error enums.
//!
//! Each component defines its own `thiserror` enum. `ErrorCode` gives every
//! variant a short machine-readable code for logs, and tells the caller
//! whether the failure should be shown to the user at all.

/// Machine-readable classification of a component error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    /// Whether this error is surfaced through the feedback channel.
    ///
    /// Session protocol violations and silent misses are not.
    fn user_visible(&self) -> bool {
        true
    }
}
