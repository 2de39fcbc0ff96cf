//! Sequential multi-agent coding pipeline.
//!
//! Five role-based agents (developer, QA, test-case generator, test runner,
//! reviewer) write, critique, test, and approve code for a free-text
//! requirement. The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure logic (JSON extraction, approval detection, test
//!   summaries, domain types). No I/O.
//! - **[`io`]**: Side-effecting operations (config, prompt rendering, agent
//!   backends, child processes).
//!
//! [`agents`] defines the personas and per-iteration tasks, [`kickoff`] runs
//! one iteration's tasks in order, and [`pipeline`] loops iterations until
//! approval or the iteration bound.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod kickoff;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
