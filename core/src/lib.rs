//! Character catalogue core: paginated fetch plus local favorites.
//!
//! # Overview
//! Loads the full character listing from a paginated JSON API by following
//! each page's `next` cursor, keeps the result in a `CharacterRepository`,
//! and projects a locally persisted set of favorite ids onto it. A UI layer
//! (native or through the C bindings in the `rickmorty-ffi` crate) only ever
//! calls `load`, `favorite_characters`, `toggle_favorite` and `subscribe`.
//!
//! # Design
//! - `CharacterClient` is stateless: it builds `HttpRequest` values and
//!   parses `HttpResponse` values. A `Transport` executes them, so the core
//!   runs offline against `FixtureTransport` in tests.
//! - `Paginator` follows cursors in a plain loop with a page cap.
//! - `FavoritesStore` is a trait; `SqliteFavoritesStore` persists to disk.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod favorites;
pub mod http;
pub mod pagination;
pub mod repository;
pub mod transport;
pub mod types;

pub use client::{CharacterClient, PageFetcher, DEFAULT_BASE_URL};
pub use config::{ApiConfig, Config, StorageConfig, StorageFailurePolicy};
pub use error::{ConfigError, FetchError, OpenError, StorageError};
pub use favorites::{FavoritesStore, InMemoryFavoritesStore, SqliteFavoritesStore};
pub use http::{HttpRequest, HttpResponse, Transport};
pub use pagination::{Paginator, DEFAULT_MAX_PAGES};
pub use repository::{CharacterRepository, LoadState, SubscriptionId};
pub use transport::{FixtureTransport, UreqTransport};
pub use types::{Character, CharacterId, CharacterStatus, FavoriteRecord, Page, PageInfo, Place};
