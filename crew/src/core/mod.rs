//! Pure, deterministic pipeline logic. No I/O.

pub mod approval;
pub mod extract;
pub mod summary;
pub mod types;
