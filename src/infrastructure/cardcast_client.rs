//! HTTP client for the Cardcast deck catalog.
//!
//! A deck is spread over two endpoints: `/decks/{code}/cards` holds the call
//! and response cards, `/decks/{code}` holds the metadata. This client calls
//! both in order and merges them. Any failure fails the whole fetch; there are
//! no retries.

use crate::config::CatalogConfig;
use crate::domain::{Deck, DeckCards, DeckError, DeckInfo, DeckSource};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Base URL for the Cardcast API
pub const BASE_URL: &str = "https://api.cardcastgame.com/v1";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = "CardcastDeckGateway/1.0";

/// Cardcast catalog client
#[derive(Clone, Debug)]
pub struct CardcastClient {
    client: Client,
    base_url: Url,
}

impl CardcastClient {
    /// Create a client against the public Cardcast API
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(base_url: &str) -> anyhow::Result<Self> {
        Self::build(
            base_url,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            USER_AGENT,
        )
    }

    /// Create a client from the `catalog` configuration section
    pub fn from_config(config: &CatalogConfig) -> anyhow::Result<Self> {
        Self::build(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    fn build(base_url: &str, timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid catalog base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Catalog base URL cannot carry a path: {}", base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `{base}/decks/{code}[/{suffix}]`, with `code` percent-encoded as a
    /// single path segment.
    fn deck_url(&self, code: &str, suffix: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("decks").push(code);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        url
    }

    /// GET a JSON document. Exactly one attempt.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, DeckError> {
        debug!("Fetching from Cardcast API: {}", url);

        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| DeckError::transport(url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DeckError::remote(url.as_str(), status, error_body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DeckError::transport(url.as_str(), &e))?;

        serde_json::from_str(&body).map_err(|e| DeckError::decode(url.as_str(), &e))
    }

    /// Fetch the call and response cards of a deck
    ///
    /// GET /decks/{code}/cards
    pub async fn fetch_cards(&self, code: &str) -> Result<DeckCards, DeckError> {
        self.get(self.deck_url(code, Some("cards"))).await
    }

    /// Fetch deck metadata
    ///
    /// GET /decks/{code}
    pub async fn fetch_info(&self, code: &str) -> Result<DeckInfo, DeckError> {
        self.get(self.deck_url(code, None)).await
    }
}

#[async_trait]
impl DeckSource for CardcastClient {
    async fn fetch_deck(&self, code: &str) -> Result<Deck, DeckError> {
        info!("Fetching deck {} from Cardcast", code);
        let cards = self.fetch_cards(code).await?;
        let info = self.fetch_info(code).await?;
        debug!(
            "Fetched deck {}: {} calls, {} responses",
            code,
            cards.calls.len(),
            cards.responses.len()
        );
        Ok(Deck::from_parts(cards, info))
    }
}
