//! Safety module root.
//!
//! Debounce timing and the four pressure safeguards that may override the
//! nominal valve commands.

pub mod debounce;
pub mod safeguards;
