//! Integration tests for the deck REST API
//!
//! Each test starts the router on an ephemeral port, backed by a
//! `DeckCache` whose Cardcast client points at a wiremock catalog.
//! Run with: `cargo test --test deck_api_test`

use cardcast_deck_gateway::api::routes::create_router;
use cardcast_deck_gateway::api::state::AppState;
use cardcast_deck_gateway::application::DeckCache;
use cardcast_deck_gateway::infrastructure::CardcastClient;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestGateway {
    base_url: String,
    catalog: MockServer,
}

/// Start a catalog mock and a gateway in front of it
async fn spawn_gateway(ttl_seconds: f64) -> TestGateway {
    let catalog = MockServer::start().await;
    let client = CardcastClient::with_base_url(&catalog.uri()).unwrap();
    let state = AppState {
        catalog_url: client.base_url().to_string(),
        deck_cache: Arc::new(DeckCache::new(Arc::new(client), ttl_seconds)),
        metrics: None,
    };
    let app = create_router(state, "*");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestGateway {
        base_url: format!("http://{}", addr),
        catalog,
    }
}

fn cards_json() -> Value {
    json!({
        "calls": [
            { "id": "c1", "text": ["Why can't I sleep at night? ", ""], "nsfw": false }
        ],
        "responses": [
            { "id": "r1", "text": ["A sassy black woman"], "nsfw": false },
            { "id": "r2", "text": ["Bees?"], "nsfw": false }
        ]
    })
}

fn info_json(code: &str) -> Value {
    json!({
        "name": "Integration Deck",
        "code": code,
        "description": null,
        "unlisted": false,
        "external_copyright": false,
        "call_count": "1",
        "response_count": "2",
        "rating": "4.0",
        "author": { "id": "a1", "username": "tester" }
    })
}

/// Mount both catalog documents for `code`, each expected `times` times
async fn mount_deck(catalog: &MockServer, code: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/decks/{}/cards", code)))
        .respond_with(ResponseTemplate::new(200).set_body_json(cards_json()))
        .expect(times)
        .mount(catalog)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/decks/{}", code)))
        .respond_with(ResponseTemplate::new(200).set_body_json(info_json(&code.to_uppercase())))
        .expect(times)
        .mount(catalog)
        .await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let gateway = spawn_gateway(300.0).await;

    let response = reqwest::get(format!("{}/health", gateway.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cached_decks"], 0);
    assert_eq!(body["ttl_seconds"], 300.0);
    assert_eq!(body["catalog"], format!("{}/", gateway.catalog.uri()));
    assert!(body.get("backend").is_none());
}

#[tokio::test]
async fn test_repeat_lookup_is_served_from_cache() {
    let gateway = spawn_gateway(300.0).await;
    mount_deck(&gateway.catalog, "abc12", 1).await;

    for _ in 0..3 {
        let response = reqwest::get(format!("{}/v1/decks/abc12", gateway.base_url))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["info"]["name"], "Integration Deck");
        assert_eq!(body["info"]["response_count"], 2);
        assert_eq!(body["calls"].as_array().unwrap().len(), 1);
        assert_eq!(body["responses"].as_array().unwrap().len(), 2);
    }

    gateway.catalog.verify().await;
}

#[tokio::test]
async fn test_equivalent_codes_share_one_entry() {
    let gateway = spawn_gateway(300.0).await;
    mount_deck(&gateway.catalog, "abc12", 1).await;

    let first = reqwest::get(format!("{}/v1/decks/ABC12", gateway.base_url))
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let second = reqwest::get(format!("{}/v1/decks/%20aBc12%20", gateway.base_url))
        .await
        .unwrap();
    assert_eq!(second.status(), 200);

    let info: Value = reqwest::get(format!("{}/v1/decks/abc12/info", gateway.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["code"], "ABC12");

    let stats: Value = reqwest::get(format!("{}/v1/cache/stats", gateway.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["fetches"], 1);
    assert_eq!(stats["hits"], 2);
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let gateway = spawn_gateway(300.0).await;
    mount_deck(&gateway.catalog, "abc12", 2).await;
    let client = reqwest::Client::new();
    let deck_url = format!("{}/v1/decks/abc12", gateway.base_url);

    assert_eq!(client.get(&deck_url).send().await.unwrap().status(), 200);

    let removed: Value = client
        .delete(format!("{}/v1/decks/ABC12", gateway.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(removed["code"], "abc12");
    assert_eq!(removed["invalidated"], true);

    let again: Value = client
        .delete(&deck_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["invalidated"], false);

    assert_eq!(client.get(&deck_url).send().await.unwrap().status(), 200);
    gateway.catalog.verify().await;
}

#[tokio::test]
async fn test_clear_empties_cache() {
    let gateway = spawn_gateway(300.0).await;
    mount_deck(&gateway.catalog, "abc12", 1).await;
    mount_deck(&gateway.catalog, "xyz99", 1).await;
    let client = reqwest::Client::new();

    for code in ["abc12", "xyz99"] {
        let url = format!("{}/v1/decks/{}", gateway.base_url, code);
        assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    }

    let cleared: Value = client
        .delete(format!("{}/v1/cache", gateway.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["cleared"], 2);

    let health: Value = reqwest::get(format!("{}/health", gateway.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["cached_decks"], 0);
}

#[tokio::test]
async fn test_unknown_deck_is_not_found() {
    let gateway = spawn_gateway(300.0).await;
    Mock::given(method("GET"))
        .and(path("/decks/nope1/cards"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "id": "not_found" })))
        .expect(1)
        .mount(&gateway.catalog)
        .await;

    let response = reqwest::get(format!("{}/v1/decks/nope1", gateway.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Deck not found: nope1");
}

#[tokio::test]
async fn test_metadata_failure_is_bad_gateway_and_not_cached() {
    let gateway = spawn_gateway(300.0).await;
    Mock::given(method("GET"))
        .and(path("/decks/half1/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cards_json()))
        .mount(&gateway.catalog)
        .await;
    Mock::given(method("GET"))
        .and(path("/decks/half1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&gateway.catalog)
        .await;

    let response = reqwest::get(format!("{}/v1/decks/half1", gateway.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 502);

    let stats: Value = reqwest::get(format!("{}/v1/cache/stats", gateway.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["entries"], 0);
    assert_eq!(stats["in_flight"], 0);
    assert_eq!(stats["fetch_failures"], 1);
}

#[tokio::test]
async fn test_zero_ttl_disables_caching() {
    let gateway = spawn_gateway(300.0).await;
    mount_deck(&gateway.catalog, "abc12", 2).await;
    let client = reqwest::Client::new();

    let updated: Value = client
        .put(format!("{}/v1/cache/ttl", gateway.base_url))
        .json(&json!({ "ttl_seconds": 0.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["ttl_seconds"], 0.0);

    let deck_url = format!("{}/v1/decks/abc12", gateway.base_url);
    assert_eq!(client.get(&deck_url).send().await.unwrap().status(), 200);
    assert_eq!(client.get(&deck_url).send().await.unwrap().status(), 200);
    gateway.catalog.verify().await;
}

#[tokio::test]
async fn test_blank_code_is_rejected() {
    let gateway = spawn_gateway(300.0).await;

    let response = reqwest::get(format!("{}/v1/decks/%20%20", gateway.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let gateway = spawn_gateway(300.0).await;

    let body: Value = reqwest::get(format!("{}/v1/openapi.json", gateway.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["paths"].get("/v1/decks/{code}").is_some());
}
