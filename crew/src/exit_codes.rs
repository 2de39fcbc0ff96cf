//! Stable exit codes for `crew` CLI commands.

/// Command succeeded; for `crew run`, the reviewer approved.
pub const OK: i32 = 0;
/// Invalid input or config, or a backend error aborted the run.
pub const INVALID: i32 = 1;
/// `crew run` used every iteration without approval.
pub const NOT_APPROVED: i32 = 2;
