//! Shared DTOs (schemas-as-code) for the xcpatch workspace.
//!
//! # Design constraints
//! - These types are intended to be serialized to disk.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod context;
pub mod report;

/// Schema identifiers.
pub mod schema {
    pub const XCPATCH_REPORT_V1: &str = "xcpatch.report.v1";
}
