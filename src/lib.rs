//! Cardcast deck gateway library
//!
//! Fetch-through caching of Cardcast decks, plus the HTTP gateway that
//! serves them. Exposed as a library for the binary, benchmarks and tests.

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
