//! Domain models for Cardcast deck documents.
//!
//! `DeckCards` and `DeckInfo` mirror the two catalog responses. `Deck` is the
//! composite the cache stores and the gateway returns.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use utoipa::ToSchema;

// ============================================================================
// Cards
// ============================================================================

/// A single call (prompt) or response card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Card {
    pub id: String,
    /// Text fragments in source order. Calls are split around their blanks.
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub nsfw: bool,
}

impl Card {
    /// First text fragment, or an empty string for a card with no text.
    pub fn primary_text(&self) -> &str {
        self.text.first().map(String::as_str).unwrap_or_default()
    }

    /// Number of blanks in a call card.
    pub fn blank_count(&self) -> usize {
        self.text.len().saturating_sub(1)
    }
}

/// Payload document from `GET /decks/{code}/cards`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeckCards {
    #[serde(default)]
    pub calls: Vec<Card>,
    #[serde(default)]
    pub responses: Vec<Card>,
}

// ============================================================================
// Metadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeckAuthor {
    pub id: String,
    pub username: String,
}

/// Metadata document from `GET /decks/{code}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeckInfo {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub copyright_holder_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unlisted: bool,
    #[serde(default)]
    pub external_copyright: bool,
    /// Total call (black) cards. The catalog sends this as a string.
    #[serde(default, deserialize_with = "number_or_string")]
    pub call_count: u32,
    /// Total response (white) cards.
    #[serde(default, deserialize_with = "number_or_string")]
    pub response_count: u32,
    #[serde(default, deserialize_with = "number_or_string")]
    pub rating: f64,
    /// Missing for decks whose author account is gone.
    #[serde(default)]
    pub author: Option<DeckAuthor>,
}

// ============================================================================
// Composite
// ============================================================================

/// A complete deck: both card lists plus metadata from one fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Deck {
    pub info: DeckInfo,
    pub calls: Vec<Card>,
    pub responses: Vec<Card>,
}

impl Deck {
    /// Merge a payload and its metadata.
    pub fn from_parts(cards: DeckCards, info: DeckInfo) -> Self {
        Self {
            info,
            calls: cards.calls,
            responses: cards.responses,
        }
    }

    pub fn code(&self) -> &str {
        &self.info.code
    }

    pub fn card_count(&self) -> usize {
        self.calls.len() + self.responses.len()
    }
}

// ============================================================================
// Helpers
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    Text(String),
    Null(()),
}

fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr + Default,
    T::Err: Display,
{
    match NumberOrString::<T>::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) if s.trim().is_empty() => Ok(T::default()),
        NumberOrString::Text(s) => s.trim().parse().map_err(de::Error::custom),
        NumberOrString::Null(()) => Ok(T::default()),
    }
}
