//! Stable exit codes for docloop CLI commands.

/// Command succeeded; for `run`, the queue drained.
pub const OK: i32 = 0;
/// Command failed due to invalid config, arguments or other errors.
pub const INVALID: i32 = 1;
/// `docloop run` stopped because the oracle could not evaluate the state.
pub const ORACLE_FAILURE: i32 = 2;
/// `docloop run` hit `max_iterations` with work still queued.
pub const MAX_ITERATIONS: i32 = 3;
