use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // System Handlers
        crate::api::handlers::health_handler,
        crate::api::handlers::metrics_handler,
        // Deck Handlers
        crate::api::handlers::deck_handler,
        crate::api::handlers::deck_info_handler,
        crate::api::handlers::invalidate_deck_handler,
        // Cache Handlers
        crate::api::handlers::cache_stats_handler,
        crate::api::handlers::clear_cache_handler,
        crate::api::handlers::update_ttl_handler
    ),
    components(
        schemas(
            crate::api::handlers::HealthResponse,
            crate::api::handlers::ErrorResponse,
            crate::api::handlers::InvalidateResponse,
            crate::api::handlers::ClearResponse,
            crate::api::handlers::TtlUpdate,
            crate::domain::Deck,
            crate::domain::DeckCards,
            crate::domain::DeckInfo,
            crate::domain::DeckAuthor,
            crate::domain::Card,
            crate::application::CacheStats
        )
    ),
    tags(
        (name = "system", description = "System endpoints for health checks and metrics"),
        (name = "Decks", description = "Cardcast deck lookups served through the cache"),
        (name = "Cache", description = "Cache management and statistics")
    ),
    info(
        title = "Cardcast Deck Gateway",
        version = "0.1.0",
        description = "REST gateway serving Cardcast decks (cards merged with deck metadata) through an in-memory fetch-through cache."
    )
)]
pub struct ApiDoc;
