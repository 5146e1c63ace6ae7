//! Offset pagination over list endpoints.
//!
//! A [`PageFetcher`] returns one raw JSON page; a [`PaginationStrategy`] turns it into typed
//! items; the [`Paginator`] drives the traversal. Pages are requested with `limit` and
//! `offset` and must come back as a bare JSON array. A page shorter than requested ends the
//! collection. Nothing reports a total count, so [`PaginationInfo::has_next`] only means the
//! last page was full.

mod fetcher;
mod info;
mod paginator;
mod strategy;

pub use fetcher::*;
pub use info::*;
pub use paginator::*;
pub use strategy::*;
