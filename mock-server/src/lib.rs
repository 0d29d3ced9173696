//! In-process stand-in for the paginated character API.
//!
//! Serves `GET /api/character?page=N` with the same envelope as the public
//! API. `next`/`prev` cursors are absolute URLs built from the request's
//! `Host` header so they work on whatever port the server was bound to.
//! `MockConfig` can inject a failing page or a self-referential cursor.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: u32,
    pub name: String,
    pub status: String,
    pub species: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub gender: String,
    pub origin: Place,
    pub location: Place,
    pub image: String,
    pub episode: Vec<String>,
    pub url: String,
    pub created: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub count: usize,
    pub pages: usize,
    pub next: Option<String>,
    pub prev: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterPage {
    pub info: PageInfo,
    pub results: Vec<Character>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

/// Shape and fault injection for the served listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockConfig {
    pub character_count: usize,
    pub page_size: usize,
    /// Answer this 1-based page with a 500.
    pub fail_page: Option<usize>,
    /// Make every page's `next` point back at itself.
    pub cyclic: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            character_count: 40,
            page_size: 20,
            fail_page: None,
            cyclic: false,
        }
    }
}

const NAMES: [&str; 6] = [
    "Rick Sanchez",
    "Morty Smith",
    "Summer Smith",
    "Beth Smith",
    "Jerry Smith",
    "Birdperson",
];
const STATUSES: [&str; 3] = ["Alive", "Dead", "unknown"];

/// Deterministic characters with ids `1..=count`.
pub fn generate_characters(count: usize) -> Vec<Character> {
    (1..=count)
        .map(|n| {
            let id = u32::try_from(n).unwrap_or(u32::MAX);
            let name = NAMES[(n - 1) % NAMES.len()];
            Character {
                id,
                name: format!("{name} #{id}"),
                status: STATUSES[(n - 1) % STATUSES.len()].to_string(),
                species: if n % 6 == 0 { "Alien" } else { "Human" }.to_string(),
                kind: String::new(),
                gender: if n % 2 == 0 { "Female" } else { "Male" }.to_string(),
                origin: Place {
                    name: "Earth (C-137)".to_string(),
                    url: "https://rickandmortyapi.com/api/location/1".to_string(),
                },
                location: Place {
                    name: "Citadel of Ricks".to_string(),
                    url: "https://rickandmortyapi.com/api/location/3".to_string(),
                },
                image: format!("https://rickandmortyapi.com/api/character/avatar/{id}.jpeg"),
                episode: (1..=(n % 4 + 1))
                    .map(|e| format!("https://rickandmortyapi.com/api/episode/{e}"))
                    .collect(),
                url: format!("https://rickandmortyapi.com/api/character/{id}"),
                created: "2017-11-04T18:48:46.250Z".to_string(),
            }
        })
        .collect()
}

#[derive(Clone)]
struct AppState {
    config: MockConfig,
    characters: Arc<Vec<Character>>,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let characters = Arc::new(generate_characters(config.character_count));
    Router::new()
        .route("/api/character", get(list_characters))
        .with_state(AppState { config, characters })
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

async fn list_characters(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    let page = query.page.unwrap_or(1);
    let page_size = state.config.page_size.max(1);
    let count = state.characters.len();
    let pages = count.div_ceil(page_size).max(1);
    debug!(page, pages, "serving character page");

    if page == 0 || page > pages {
        return error_body(StatusCode::NOT_FOUND, "There is nothing here");
    }
    if state.config.fail_page == Some(page) {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let page_url = |n: usize| format!("http://{host}/api/character?page={n}");

    let next = if state.config.cyclic {
        Some(page_url(page))
    } else if page < pages {
        Some(page_url(page + 1))
    } else {
        None
    };
    let prev = (page > 1).then(|| page_url(page - 1));

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(count);
    let results = state.characters[start..end].to_vec();

    Json(CharacterPage {
        info: PageInfo {
            count,
            pages,
            next,
            prev,
        },
        results,
    })
    .into_response()
}
