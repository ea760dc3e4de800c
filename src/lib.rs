//! Tag taxonomy, study and author store for systematic literature reviews.
//!
//! Each review owns a tag forest, a list of authors and a list of studies.
//! [`db::Database`] implements every operation against SQLite, [`api`] binds
//! them to REST routes, and whole reviews move between databases as
//! [`models::ReviewDocument`]s.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod tree_render;

pub use error::{Error, Result};
