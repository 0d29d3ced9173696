use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, CharacterPage, MockConfig};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::HOST, "mock.test")
        .body(String::new())
        .unwrap()
}

// --- first page ---

#[tokio::test]
async fn first_page_without_query() {
    let resp = app().oneshot(get("/api/character")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let page: CharacterPage = body_json(resp).await;
    assert_eq!(page.info.count, 40);
    assert_eq!(page.info.pages, 2);
    assert_eq!(page.results.len(), 20);
    assert_eq!(page.results[0].id, 1);
    assert_eq!(
        page.info.next.as_deref(),
        Some("http://mock.test/api/character?page=2")
    );
    assert!(page.info.prev.is_none());
}

// --- last page ---

#[tokio::test]
async fn last_page_has_null_next() {
    let resp = app().oneshot(get("/api/character?page=2")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let page: CharacterPage = body_json(resp).await;
    assert_eq!(page.results.len(), 20);
    assert_eq!(page.results[0].id, 21);
    assert!(page.info.next.is_none());
    assert_eq!(
        page.info.prev.as_deref(),
        Some("http://mock.test/api/character?page=1")
    );
}

#[tokio::test]
async fn short_last_page() {
    let config = MockConfig {
        character_count: 45,
        ..MockConfig::default()
    };
    let resp = app_with(config)
        .oneshot(get("/api/character?page=3"))
        .await
        .unwrap();

    let page: CharacterPage = body_json(resp).await;
    assert_eq!(page.info.pages, 3);
    let ids: Vec<u32> = page.results.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![41, 42, 43, 44, 45]);
}

// --- out of range ---

#[tokio::test]
async fn page_past_the_end_returns_404() {
    let resp = app().oneshot(get("/api/character?page=3")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"], "There is nothing here");
}

#[tokio::test]
async fn page_zero_returns_404() {
    let resp = app().oneshot(get("/api/character?page=0")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_page_returns_400() {
    let resp = app().oneshot(get("/api/character?page=two")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- empty listing ---

#[tokio::test]
async fn empty_listing_is_a_single_empty_page() {
    let config = MockConfig {
        character_count: 0,
        ..MockConfig::default()
    };
    let resp = app_with(config).oneshot(get("/api/character")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let page: CharacterPage = body_json(resp).await;
    assert!(page.results.is_empty());
    assert!(page.info.next.is_none());
}

// --- fault injection ---

#[tokio::test]
async fn injected_failure_returns_500() {
    let config = MockConfig {
        fail_page: Some(2),
        ..MockConfig::default()
    };
    let router = app_with(config);

    let ok = router.clone().oneshot(get("/api/character")).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let failed = router.oneshot(get("/api/character?page=2")).await.unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_bytes(failed).await.is_empty());
}

#[tokio::test]
async fn cyclic_cursor_points_back_at_same_page() {
    let config = MockConfig {
        cyclic: true,
        ..MockConfig::default()
    };
    let resp = app_with(config)
        .oneshot(get("/api/character?page=2"))
        .await
        .unwrap();

    let page: CharacterPage = body_json(resp).await;
    assert_eq!(
        page.info.next.as_deref(),
        Some("http://mock.test/api/character?page=2")
    );
}

// --- cursor walk ---

#[tokio::test]
async fn following_next_cursors_visits_every_character_once() {
    let config = MockConfig {
        character_count: 55,
        page_size: 10,
        ..MockConfig::default()
    };
    let router = app_with(config);

    let mut uri = "/api/character".to_string();
    let mut ids = Vec::new();
    loop {
        let resp = router.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let page: CharacterPage = body_json(resp).await;
        ids.extend(page.results.iter().map(|c| c.id));
        match page.info.next {
            Some(next) => uri = next.trim_start_matches("http://mock.test").to_string(),
            None => break,
        }
    }

    assert_eq!(ids, (1..=55).collect::<Vec<u32>>());
}
