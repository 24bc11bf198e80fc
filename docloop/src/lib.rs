//! Objective-driven documentation and maintenance loop.
//!
//! An operator states an objective; the oracle turns it into a plan of typed
//! actions which run one at a time against the project, folding results into a
//! layered context until the oracle judges the objective complete.
//!
//! - **[`core`]**: Pure, deterministic logic (action catalog, normalization,
//!   plan extraction, verdicts, the context store). No I/O.
//! - **[`io`]**: Side-effecting collaborators (oracle process, files, operator,
//!   feature analysis, config, run artifacts), each behind a trait so tests can
//!   script them.
//!
//! [`dispatch`] maps actions onto handlers; [`orchestrator`] drives the queue.

pub mod core;
pub mod dispatch;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
