pub mod deck_cache;

pub use deck_cache::{CacheStats, DeckCache};
