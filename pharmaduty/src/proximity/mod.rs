//! Proximity ranking.
//!
//! Selects the k nearest points of interest from a candidate set using a
//! bounded running selection instead of a full sort. Candidate sets here
//! are small (a city's duty roster, bounded in the tens), so no spatial
//! index is involved.

mod selector;

pub use selector::{select_nearest, Locatable, RankedPoint};
