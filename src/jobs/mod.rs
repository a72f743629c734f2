//! Background job tracking for formulary
//!
//! PDF imports run as backend jobs. This module keeps a cached job table with
//! explicit invalidation (mirroring the formula cache) and polls single jobs
//! until they finish.

pub mod board;
pub mod poll;

// Re-export main types and functions
pub use board::JobBoard;
pub use poll::wait_for_job;
