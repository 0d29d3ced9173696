//! C-ABI wrapper around `rickmorty-core`.
//!
//! # Overview
//! Exposes the character repository through `extern "C"` functions so a
//! native UI (Swift, Kotlin via JNI, plain C) can load the listing, read
//! favorites, toggle favorites and observe load state without linking to
//! serde, ureq or rusqlite directly.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Calls that return data use a single `FfiResult` envelope with
//!   `FfiDataTag` + `void* data`; boolean-ish calls return an `int32_t`
//!   tri-state (1 true, 0 false, -1 error).
//! - `rm_repository_load` blocks; hosts call it off their UI thread. State
//!   callbacks fire on the loading thread.
//! - The C caller owns all returned pointers and must call the matching
//!   `rm_*_free` / `rm_free_result` function to release them.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use rickmorty_core::{
    CharacterId, CharacterRepository, Config, LoadState, StorageFailurePolicy, SubscriptionId,
};
use tracing_subscriber::EnvFilter;

use types::*;

/// Read a C string argument; null and invalid UTF-8 both yield `None`.
fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Route core log events to stderr. `filter` uses `RUST_LOG` syntax
/// (e.g. `"rickmorty_core=debug"`); null means `"info"`.
///
/// Returns false if a global subscriber was already installed.
#[unsafe(no_mangle)]
pub extern "C" fn rm_logging_init(filter: *const c_char) -> bool {
    catch_unwind(|| {
        let filter = read_str(filter).unwrap_or("info");
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Repository lifecycle
// ---------------------------------------------------------------------------

/// Create a repository for the API rooted at `base_url`.
///
/// `database_path` may be null, in which case favorites live in memory for
/// the lifetime of the handle. `max_pages` of 0 keeps the default cap.
/// When `propagate_storage_errors` is false, favorites storage failures are
/// logged and degraded instead of reported.
///
/// Returns null on a null/invalid `base_url` or if the database cannot be
/// opened. The caller must free the handle with `rm_repository_free`.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_new(
    base_url: *const c_char,
    database_path: *const c_char,
    max_pages: u32,
    propagate_storage_errors: bool,
) -> *mut FfiRepository {
    catch_unwind(|| {
        let Some(base_url) = read_str(base_url) else {
            return std::ptr::null_mut();
        };
        let mut config = Config::default();
        config.api.base_url = base_url.to_string();
        if max_pages > 0 {
            config.api.max_pages = max_pages as usize;
        }
        if propagate_storage_errors {
            config.storage.on_failure = StorageFailurePolicy::Propagate;
        }
        if config.validate().is_err() {
            return std::ptr::null_mut();
        }
        let database = read_str(database_path).map(PathBuf::from);
        open_repository(&config, database)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a repository from a TOML config file. Returns null if the file
/// cannot be read, fails validation, or names an unopenable database.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_from_config(config_path: *const c_char) -> *mut FfiRepository {
    catch_unwind(|| {
        let Some(path) = read_str(config_path) else {
            return std::ptr::null_mut();
        };
        match Config::load(path) {
            Ok(config) => {
                let database = Some(config.storage.database.clone());
                open_repository(&config, database)
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot load config");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

fn open_repository(config: &Config, database: Option<PathBuf>) -> *mut FfiRepository {
    let opened = match database {
        Some(path) => {
            let mut config = config.clone();
            config.storage.database = path;
            CharacterRepository::open(&config)
        }
        None => CharacterRepository::open_ephemeral(config),
    };
    match opened {
        Ok(inner) => Box::into_raw(Box::new(FfiRepository { inner })),
        Err(err) => {
            tracing::warn!(error = %err, "cannot open repository");
            std::ptr::null_mut()
        }
    }
}

/// Free a repository created by `rm_repository_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_free(repo: *mut FfiRepository) {
    if !repo.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(repo) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Loading and reading
// ---------------------------------------------------------------------------

/// Fetch every page. Blocks until the load (or an overlapping one already
/// in flight) finishes.
///
/// Returns a result with `data_tag = CharacterList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_load(repo: *const FfiRepository) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if repo.is_null() {
            return FfiResult::null_arg("repo");
        }
        let repo = unsafe { &*repo };
        match repo.inner.load() {
            Ok(characters) => FfiResult::ok_character_list(&characters),
            Err(e) => FfiResult::from_fetch_error(&e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in rm_repository_load"))
}

/// The last successfully loaded list (empty before the first load).
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_characters(repo: *const FfiRepository) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if repo.is_null() {
            return FfiResult::null_arg("repo");
        }
        let repo = unsafe { &*repo };
        FfiResult::ok_character_list(&repo.inner.characters())
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in rm_repository_characters"))
}

/// Look up one loaded character for a detail screen.
///
/// Returns `data_tag = Character` on success, `NotFound` if the id is not
/// in the loaded list.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_character(repo: *const FfiRepository, id: u32) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if repo.is_null() {
            return FfiResult::null_arg("repo");
        }
        let repo = unsafe { &*repo };
        match repo.inner.character(CharacterId(id)) {
            Some(character) => FfiResult::ok_character(&character),
            None => FfiResult::not_found(&format!("character {id}")),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in rm_repository_character"))
}

/// Loaded characters that are favorites, in list order.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_favorite_characters(repo: *const FfiRepository) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if repo.is_null() {
            return FfiResult::null_arg("repo");
        }
        let repo = unsafe { &*repo };
        match repo.inner.favorite_characters() {
            Ok(characters) => FfiResult::ok_character_list(&characters),
            Err(e) => FfiResult::from_storage_error(&e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in rm_repository_favorite_characters"))
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

/// Flip the favorite flag for `id`. Returns the new flag (1/0), or -1 on a
/// null handle, a propagated storage error, or a panic.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_toggle_favorite(repo: *const FfiRepository, id: u32) -> i32 {
    catch_unwind(AssertUnwindSafe(|| {
        if repo.is_null() {
            return -1;
        }
        let repo = unsafe { &*repo };
        match repo.inner.toggle_favorite(CharacterId(id)) {
            Ok(now_favorite) => i32::from(now_favorite),
            Err(_) => -1,
        }
    }))
    .unwrap_or(-1)
}

/// Returns 1 if `id` is a favorite, 0 if not, -1 on error.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_is_favorite(repo: *const FfiRepository, id: u32) -> i32 {
    catch_unwind(AssertUnwindSafe(|| {
        if repo.is_null() {
            return -1;
        }
        let repo = unsafe { &*repo };
        match repo.inner.is_favorite(CharacterId(id)) {
            Ok(found) => i32::from(found),
            Err(_) => -1,
        }
    }))
    .unwrap_or(-1)
}

// ---------------------------------------------------------------------------
// State observation
// ---------------------------------------------------------------------------

/// Register `callback` for every load state transition. `user_data` is
/// passed back on each call.
///
/// Returns a non-zero subscription id, or 0 if `repo` or `callback` is null.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_subscribe(
    repo: *const FfiRepository,
    callback: Option<FfiStateCallback>,
    user_data: *mut c_void,
) -> u64 {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(callback) = callback else {
            return 0;
        };
        if repo.is_null() {
            return 0;
        }
        let repo = unsafe { &*repo };
        let user_data = UserData(user_data);
        let id = repo.inner.subscribe(move |state| {
            let (count, message) = match state {
                LoadState::Loaded(characters) => (u32::try_from(characters.len()).unwrap_or(u32::MAX), None),
                LoadState::Error(err) => (0, CString::new(err.to_string().replace('\0', "")).ok()),
                LoadState::Idle | LoadState::Loading => (0, None),
            };
            let message_ptr = message.as_ref().map_or(std::ptr::null(), |m| m.as_ptr());
            callback(FfiLoadState::from(state), count, message_ptr, user_data.get());
        });
        u64::from(id)
    }))
    .unwrap_or(0)
}

/// Remove a subscription. Returns false if `id` was not registered.
#[unsafe(no_mangle)]
pub extern "C" fn rm_repository_unsubscribe(repo: *const FfiRepository, id: u64) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if repo.is_null() {
            return false;
        }
        let repo = unsafe { &*repo };
        repo.inner.unsubscribe(SubscriptionId::from(id))
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResult` returned by any `rm_repository_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn rm_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::Character => {
                    let character = unsafe { Box::from_raw(result.data.cast::<FfiCharacter>()) };
                    free_ffi_character_fields(&character);
                }
                FfiDataTag::CharacterList => {
                    let list = unsafe { Box::from_raw(result.data.cast::<FfiCharacterList>()) };
                    if !list.items.is_null() && list.len > 0 {
                        let items = unsafe {
                            Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                                list.items,
                                list.len as usize,
                            ))
                        };
                        for item in items.iter() {
                            free_ffi_character_fields(item);
                        }
                    }
                }
                FfiDataTag::None => {}
            }
        }
    }));
}

/// Free the C-string fields of an `FfiCharacter` (but not the struct itself).
fn free_ffi_character_fields(character: &FfiCharacter) {
    for field in [
        character.name,
        character.species,
        character.kind,
        character.gender,
        character.origin,
        character.location,
        character.image,
    ] {
        if !field.is_null() {
            drop(unsafe { CString::from_raw(field) });
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Start the mock server on a random port and return its API base URL.
    fn start_server() -> CString {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });
        CString::new(format!("http://{addr}/api")).unwrap()
    }

    fn offline_repo() -> *mut FfiRepository {
        let url = CString::new("http://127.0.0.1:9/api").unwrap();
        let repo = rm_repository_new(url.as_ptr(), std::ptr::null(), 0, false);
        assert!(!repo.is_null());
        repo
    }

    fn list_ids(result: *mut FfiResult) -> Vec<u32> {
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::CharacterList);
        let list = unsafe { &*(r.data as *const FfiCharacterList) };
        if list.len == 0 {
            return Vec::new();
        }
        let items = unsafe { std::slice::from_raw_parts(list.items, list.len as usize) };
        items.iter().map(|c| c.id).collect()
    }

    #[test]
    fn repository_new_and_free() {
        let repo = offline_repo();
        rm_repository_free(repo);
    }

    #[test]
    fn repository_new_null_url_returns_null() {
        let repo = rm_repository_new(std::ptr::null(), std::ptr::null(), 0, false);
        assert!(repo.is_null());
    }

    #[test]
    fn repository_new_relative_url_returns_null() {
        let url = CString::new("not a url").unwrap();
        let repo = rm_repository_new(url.as_ptr(), std::ptr::null(), 0, false);
        assert!(repo.is_null());
    }

    #[test]
    fn repository_free_null_is_safe() {
        rm_repository_free(std::ptr::null_mut());
    }

    #[test]
    fn null_repo_is_reported_everywhere() {
        let result = rm_repository_load(std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        rm_free_result(result);

        let result = rm_repository_favorite_characters(std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        rm_free_result(result);

        assert_eq!(rm_repository_toggle_favorite(std::ptr::null(), 1), -1);
        assert_eq!(rm_repository_is_favorite(std::ptr::null(), 1), -1);
        assert!(!rm_repository_unsubscribe(std::ptr::null(), 1));
    }

    #[test]
    fn toggle_favorite_flips_flag() {
        let repo = offline_repo();
        assert_eq!(rm_repository_is_favorite(repo, 3), 0);
        assert_eq!(rm_repository_toggle_favorite(repo, 3), 1);
        assert_eq!(rm_repository_is_favorite(repo, 3), 1);
        assert_eq!(rm_repository_toggle_favorite(repo, 3), 0);
        assert_eq!(rm_repository_is_favorite(repo, 3), 0);
        rm_repository_free(repo);
    }

    #[test]
    fn favorites_are_empty_before_any_load() {
        let repo = offline_repo();
        rm_repository_toggle_favorite(repo, 1);
        let result = rm_repository_favorite_characters(repo);
        assert!(list_ids(result).is_empty());
        rm_free_result(result);
        rm_repository_free(repo);
    }

    #[test]
    fn character_lookup_before_load_is_not_found() {
        let repo = offline_repo();
        let result = rm_repository_character(repo, 1);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NotFound);
        assert!(!r.error_message.is_null());
        assert!(r.data.is_null());
        rm_free_result(result);
        rm_repository_free(repo);
    }

    #[test]
    fn subscribe_null_callback_returns_zero() {
        let repo = offline_repo();
        assert_eq!(rm_repository_subscribe(repo, None, std::ptr::null_mut()), 0);
        rm_repository_free(repo);
    }

    #[test]
    fn free_result_null_is_safe() {
        rm_free_result(std::ptr::null_mut());
    }

    extern "C" fn count_states(
        state: FfiLoadState,
        count: u32,
        error_message: *const c_char,
        user_data: *mut c_void,
    ) {
        let counter = unsafe { &*(user_data as *const AtomicUsize) };
        match state {
            FfiLoadState::Loading => {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            FfiLoadState::Loaded => {
                assert_eq!(count, 40);
                assert!(error_message.is_null());
                counter.fetch_add(100, Ordering::SeqCst);
            }
            FfiLoadState::Error => {
                assert!(!error_message.is_null());
                counter.fetch_add(10_000, Ordering::SeqCst);
            }
            FfiLoadState::Idle => {}
        }
    }

    #[test]
    fn load_against_mock_server_notifies_and_returns_list() {
        let url = start_server();
        let repo = rm_repository_new(url.as_ptr(), std::ptr::null(), 0, false);
        assert!(!repo.is_null());
        let counter = AtomicUsize::new(0);
        let sub = rm_repository_subscribe(
            repo,
            Some(count_states),
            &counter as *const AtomicUsize as *mut c_void,
        );
        assert_ne!(sub, 0);
        rm_repository_toggle_favorite(repo, 2);
        rm_repository_toggle_favorite(repo, 500);

        let result = rm_repository_load(repo);
        assert_eq!(list_ids(result), (1..=40).collect::<Vec<u32>>());
        rm_free_result(result);
        assert_eq!(counter.load(Ordering::SeqCst), 101);

        let result = rm_repository_favorite_characters(repo);
        assert_eq!(list_ids(result), vec![2]);
        rm_free_result(result);

        let result = rm_repository_character(repo, 2);
        let r = unsafe { &*result };
        assert_eq!(r.data_tag, FfiDataTag::Character);
        let character = unsafe { &*(r.data as *const FfiCharacter) };
        let name = unsafe { CStr::from_ptr(character.name) }.to_str().unwrap();
        assert_eq!(name, "Morty Smith #2");
        assert!(matches!(character.status, FfiCharacterStatus::Dead));
        rm_free_result(result);

        assert!(rm_repository_unsubscribe(repo, sub));
        rm_repository_free(repo);
    }

    #[test]
    fn state_callback_receives_user_data_on_failed_load() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = CString::new(format!("http://127.0.0.1:{port}/api")).unwrap();
        let repo = rm_repository_new(url.as_ptr(), std::ptr::null(), 0, false);
        let counter = AtomicUsize::new(0);
        let sub = rm_repository_subscribe(
            repo,
            Some(count_states),
            &counter as *const AtomicUsize as *mut c_void,
        );
        assert_ne!(sub, 0);

        rm_free_result(rm_repository_load(repo));
        assert_eq!(counter.load(Ordering::SeqCst), 10_001);

        assert!(rm_repository_unsubscribe(repo, sub));
        rm_free_result(rm_repository_load(repo));
        assert_eq!(counter.load(Ordering::SeqCst), 10_001);
        rm_repository_free(repo);
    }

    #[test]
    fn load_failure_sets_error_code() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = CString::new(format!("http://127.0.0.1:{port}/api")).unwrap();
        let repo = rm_repository_new(url.as_ptr(), std::ptr::null(), 0, false);
        let result = rm_repository_load(repo);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Transport);
        assert!(!r.error_message.is_null());
        assert_eq!(r.data_tag, FfiDataTag::None);
        rm_free_result(result);
        rm_repository_free(repo);
    }

    #[test]
    fn from_config_opens_database_named_in_file() {
        let dir = std::env::temp_dir().join(format!("rickmorty-ffi-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let db = dir.join("favorites.sqlite3");
        let config_path = dir.join("app.toml");
        std::fs::write(
            &config_path,
            format!("[storage]\ndatabase = {:?}\n", db.to_str().unwrap()),
        )
        .unwrap();
        let path = CString::new(config_path.to_str().unwrap()).unwrap();

        let repo = rm_repository_from_config(path.as_ptr());
        assert!(!repo.is_null());
        assert_eq!(rm_repository_toggle_favorite(repo, 11), 1);
        rm_repository_free(repo);
        assert!(db.exists());

        let repo = rm_repository_from_config(path.as_ptr());
        assert_eq!(rm_repository_is_favorite(repo, 11), 1);
        rm_repository_free(repo);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
