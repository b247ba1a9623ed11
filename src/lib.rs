//! Places camp participants into capacity-limited programs.
//!
//! The [`catalog`] is read from two CSV tables, the [`allocator`] searches
//! random participant orders with a greedy first-fit pass, and [`report`]
//! turns the best trial into the placement table.

pub mod allocator;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod models;
pub mod report;

pub use allocator::{Allocator, ParticipantState, SearchReport, Trial, TrialOutcome};
pub use catalog::Catalog;
pub use error::PlacementError;
pub use models::Config;
