//! Domain DTOs for the character API.
//!
//! # Design
//! These types mirror the remote API's schema but only the fields the app
//! consumes are declared; serde ignores the rest (`url`, `created`, ...).
//! The mock-server crate defines its own copies of the wire shapes, and the
//! integration tests catch any drift between the two.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier assigned to a character by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub u32);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for CharacterId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Life status reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterStatus {
    #[serde(rename = "Alive")]
    Alive,
    #[serde(rename = "Dead")]
    Dead,
    #[serde(rename = "unknown", alias = "Unknown")]
    Unknown,
}

/// A named place (origin or last known location).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
}

/// A single character as returned inside a page's `results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub status: CharacterStatus,
    pub species: String,
    /// Sub-species or variant; the API calls this field `type` and sends an
    /// empty string when there is none.
    #[serde(rename = "type")]
    pub kind: String,
    pub gender: String,
    pub origin: Place,
    pub location: Place,
    /// Avatar URL.
    pub image: String,
    /// Episode URLs the character appears in.
    pub episode: Vec<String>,
}

impl Character {
    pub fn episode_count(&self) -> usize {
        self.episode.len()
    }
}

/// Pagination metadata carried in every page envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub pages: Option<u32>,
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
}

/// One page of the character listing: `{ info: {...}, results: [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub info: PageInfo,
    pub results: Vec<Character>,
}

impl Page {
    /// The cursor for the following page, if the server sent one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.info.next.as_deref()
    }
}

/// A persisted favorite marker. Only the id is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteRecord {
    pub character_id: CharacterId,
}
