//! Run the page-chain vectors in `test-vectors/pagination.json`.
//!
//! Each case registers its pages with a `FixtureTransport`, runs one
//! `Paginator::collect` from the shared start URL and compares either the
//! accumulated ids or the error kind. Result objects in the vectors only
//! carry an `id`; the remaining character fields are filled in here.

use rickmorty_core::{
    CharacterClient, FetchError, FixtureTransport, HttpResponse, PageFetcher, Paginator,
    DEFAULT_MAX_PAGES,
};
use serde_json::Value;

const BASE_URL: &str = "http://api.test/api";

/// Expand `{ "id": n }` into a full character object.
fn complete_character(stub: &Value) -> Value {
    let id = stub["id"].clone();
    let mut character = serde_json::json!({
        "id": id,
        "name": format!("Character {id}"),
        "status": "Alive",
        "species": "Human",
        "type": "",
        "gender": "unknown",
        "origin": { "name": "Earth" },
        "location": { "name": "Earth" },
        "image": format!("{BASE_URL}/character/avatar/{id}.jpeg"),
        "episode": []
    });
    if let (Some(target), Some(source)) = (character.as_object_mut(), stub.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    character
}

fn page_body(page: &Value) -> String {
    if let Some(raw) = page.get("raw_body") {
        return raw.as_str().unwrap().to_string();
    }
    let mut body = page["body"].clone();
    let results: Vec<Value> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(complete_character)
        .collect();
    body["results"] = Value::Array(results);
    body.to_string()
}

fn error_kind(err: &FetchError) -> &'static str {
    match err {
        FetchError::InvalidUrl(_) => "invalid_url",
        FetchError::Transport(_) => "transport",
        FetchError::Http { .. } => "http",
        FetchError::NoData => "no_data",
        FetchError::Decode { .. } => "decode",
        FetchError::TooManyPages { .. } => "too_many_pages",
    }
}

#[test]
fn pagination_test_vectors() {
    let raw = include_str!("../../test-vectors/pagination.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let start_url = vectors["start_url"].as_str().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        let mut transport = FixtureTransport::new();
        for page in case["pages"].as_array().unwrap() {
            let status = u16::try_from(page["status"].as_u64().unwrap()).unwrap();
            transport = transport.respond(
                page["url"].as_str().unwrap(),
                HttpResponse::with_status(status, page_body(page)),
            );
        }
        let max_pages = case
            .get("max_pages")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_MAX_PAGES, |n| usize::try_from(n).unwrap());
        let fetcher = PageFetcher::new(CharacterClient::new(BASE_URL), transport);

        let outcome = Paginator::new(max_pages).collect(&fetcher, start_url);

        let expected = &case["expected"];
        if let Some(ids) = expected.get("ids") {
            let expected_ids: Vec<u64> = ids.as_array().unwrap().iter().map(|v| v.as_u64().unwrap()).collect();
            let characters = outcome.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
            let got: Vec<u64> = characters.iter().map(|c| u64::from(c.id.0)).collect();
            assert_eq!(got, expected_ids, "{name}: ids");
        } else {
            let expected_error = expected["error"].as_str().unwrap();
            let err = match outcome {
                Ok(characters) => panic!("{name}: expected {expected_error}, got {} characters", characters.len()),
                Err(err) => err,
            };
            assert_eq!(error_kind(&err), expected_error, "{name}: error kind");
        }
    }
}
