//! Domain layer - deck entities, error taxonomy and the source trait.
//!
//! This module defines what a deck is and how the application layer asks
//! for one, independent of where decks actually come from:
//! - `deck_models`: cards, metadata and the composite `Deck`
//! - `error`: `DeckError`, the failure kinds of a catalog lookup
//! - `DeckSource`: the trait the cache fetches through

pub mod deck_models;
pub mod error;

pub use deck_models::*;
pub use error::{DeckError, Result};

use async_trait::async_trait;

/// Source of complete decks.
///
/// The fetch-through cache delegates every miss to a `DeckSource`.
/// Implementations must be thread-safe (`Send + Sync`) since concurrent
/// lookups share one source.
///
/// # Implementations
///
/// See `infrastructure::cardcast_client::CardcastClient` for the Cardcast
/// catalog implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeckSource: Send + Sync {
    /// Fetch a complete deck by play code.
    ///
    /// `code` is already normalized by the caller. A deck is only returned
    /// when both its cards and its metadata were retrieved; any failure
    /// along the way is returned as-is with no partial result.
    async fn fetch_deck(&self, code: &str) -> Result<Deck>;
}
