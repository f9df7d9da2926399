//! Drag-to-commit quick-add engine for the expense dashboard.
//!
//! The host UI owns rendering and raw input. This crate owns everything
//! between a pointer-down on a quick-add card and a durable expense row:
//! tracking the in-flight drag, caching the measured drop-zone box,
//! hit-testing the release point, committing the expense optimistically and
//! reconciling it with the remote service, and queueing the user-facing
//! status messages that result.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`dashboard`] | Single-writer event loop, exposed API, and view stream |
//! | [`gesture`] | Drag session state machine |
//! | [`dropzone`] | Drop-zone measurement cache |
//! | [`collision`] | Point-in-rectangle drop resolution |
//! | [`commit`] | Optimistic commit and reconciliation |
//! | [`feedback`] | Transient status message queue |
//! | [`templates`] | Quick-add templates and the template command set |
//! | [`backend`] | Remote persistence and identity seams |
//! | [`model`] | Templates, expenses, amounts, and ids |
//! | [`geometry`] | Points, rectangles, and measured geometry |
//! | [`clock`] | Wall-clock access for "today" and measurement stamps |
//! | [`config`] | Environment-driven tuning knobs |
//! | [`error`] | Stable error codes shared by the component errors |
//! | [`consts`] | Shared defaults and labels |

pub mod backend;
pub mod clock;
pub mod collision;
pub mod commit;
pub mod config;
pub mod consts;
pub mod dashboard;
pub mod dropzone;
pub mod error;
pub mod feedback;
pub mod geometry;
pub mod gesture;
pub mod model;
pub mod templates;
