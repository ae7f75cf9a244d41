//! Core trait abstractions.
//!
//! The pipeline talks to the network through [`fetcher::Fetcher`] and to the
//! database through [`store::BatchStore`], so both can be swapped for mocks.

pub mod fetcher;
pub mod store;
