//! Domain types for the shelf crawler.

pub mod batch;
pub mod config;
pub mod game;
