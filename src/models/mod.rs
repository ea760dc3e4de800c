//! Domain models for SysRev.
//!
//! # Core Concepts
//!
//! - [`Review`]: Top-level workspace. Every other entity belongs to exactly one review
//!   and never crosses review boundaries.
//! - [`Tag`]: Node of the review's classification taxonomy, forming a forest via `parent_id`.
//! - [`Study`]: A paper under review, classified by tags, flags and authors.
//! - [`Author`]: A study author, unique by name within a review.
//!
//! ## Transfer
//!
//! - [`ReviewDocument`]: Identity-free export of a whole review, re-importable anywhere.
//! - [`ImportSummary`]: What an import created versus reused.

mod author;
mod payload;
mod review;
mod stats;
mod study;
mod tag;
mod transfer;

pub use author::*;
pub use payload::*;
pub use review::*;
pub use stats::*;
pub use study::*;
pub use tag::*;
pub use transfer::*;
