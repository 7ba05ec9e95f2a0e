//! Domain types for the tours service.
//!
//! Holds the tour schema (fields, validation, slug and derived values), the
//! query feature pipeline that turns raw query-string parameters into a
//! [`features::TourQuery`], and the shared error type. Nothing in this crate
//! performs I/O.

pub mod error;
pub mod features;
pub mod report;
pub mod tour;
pub mod types;
