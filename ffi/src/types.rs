//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use rickmorty_core::{
    Character, CharacterRepository, CharacterStatus, FetchError, LoadState, SqliteFavoritesStore,
    StorageError, UreqTransport,
};

/// Opaque handle to a character repository. C callers receive a pointer to
/// this and pass it back into every FFI function.
pub struct FfiRepository {
    pub(crate) inner: CharacterRepository<UreqTransport, SqliteFavoritesStore>,
}

/// Copy `s` into a heap C string owned by the caller. Interior NULs are
/// dropped rather than failing the whole conversion.
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

// ---------------------------------------------------------------------------
// Character types
// ---------------------------------------------------------------------------

#[repr(C)]
pub enum FfiCharacterStatus {
    Alive = 0,
    Dead = 1,
    Unknown = 2,
}

impl From<CharacterStatus> for FfiCharacterStatus {
    fn from(status: CharacterStatus) -> Self {
        match status {
            CharacterStatus::Alive => FfiCharacterStatus::Alive,
            CharacterStatus::Dead => FfiCharacterStatus::Dead,
            CharacterStatus::Unknown => FfiCharacterStatus::Unknown,
        }
    }
}

/// A single character exposed to C. `kind` is the API's `type` field.
#[repr(C)]
pub struct FfiCharacter {
    pub id: u32,
    pub name: *mut c_char,
    pub status: FfiCharacterStatus,
    pub species: *mut c_char,
    pub kind: *mut c_char,
    pub gender: *mut c_char,
    pub origin: *mut c_char,
    pub location: *mut c_char,
    pub image: *mut c_char,
    pub episode_count: u32,
}

impl FfiCharacter {
    fn from_core(character: &Character) -> Self {
        FfiCharacter {
            id: character.id.0,
            name: to_c_string(&character.name),
            status: character.status.into(),
            species: to_c_string(&character.species),
            kind: to_c_string(&character.kind),
            gender: to_c_string(&character.gender),
            origin: to_c_string(&character.origin.name),
            location: to_c_string(&character.location.name),
            image: to_c_string(&character.image),
            episode_count: u32::try_from(character.episode_count()).unwrap_or(u32::MAX),
        }
    }
}

/// A list of characters exposed to C.
#[repr(C)]
pub struct FfiCharacterList {
    pub items: *mut FfiCharacter,
    pub len: u32,
}

// ---------------------------------------------------------------------------
// State notifications
// ---------------------------------------------------------------------------

/// Load state as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiLoadState {
    Idle = 0,
    Loading = 1,
    Loaded = 2,
    Error = 3,
}

impl From<&LoadState> for FfiLoadState {
    fn from(state: &LoadState) -> Self {
        match state {
            LoadState::Idle => FfiLoadState::Idle,
            LoadState::Loading => FfiLoadState::Loading,
            LoadState::Loaded(_) => FfiLoadState::Loaded,
            LoadState::Error(_) => FfiLoadState::Error,
        }
    }
}

/// Observer callback. `count` is the number of loaded characters (only
/// meaningful for `Loaded`); `error_message` is non-null only for `Error`
/// and is valid for the duration of the call.
pub type FfiStateCallback = extern "C" fn(
    state: FfiLoadState,
    count: u32,
    error_message: *const c_char,
    user_data: *mut c_void,
);

/// Host context pointer handed back to the callback untouched.
pub(crate) struct UserData(pub(crate) *mut c_void);

impl UserData {
    /// Accessing the pointer through `&self` makes closures capture the
    /// whole wrapper, which is what carries `Send`/`Sync`.
    pub(crate) fn get(&self) -> *mut c_void {
        self.0
    }
}

// SAFETY: the pointer is never dereferenced on the Rust side; the host that
// registered it is responsible for its thread-safety.
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidUrl = 1,
    Transport = 2,
    Http = 3,
    NoData = 4,
    Decode = 5,
    TooManyPages = 6,
    Storage = 7,
    NotFound = 8,
    Panic = 9,
    NullArg = 10,
}

/// Tag that tells `rm_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Character = 1,
    CharacterList = 2,
}

/// Result envelope for every call that returns data.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    fn boxed(
        error_code: FfiErrorCode,
        error_message: *mut c_char,
        http_status: u16,
        data_tag: FfiDataTag,
        data: *mut c_void,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message,
            http_status,
            data_tag,
            data,
        }))
    }

    /// Build a success result carrying a single `FfiCharacter`.
    pub(crate) fn ok_character(character: &Character) -> *mut Self {
        let ffi_character = Box::new(FfiCharacter::from_core(character));
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            0,
            FfiDataTag::Character,
            Box::into_raw(ffi_character).cast(),
        )
    }

    /// Build a success result carrying an `FfiCharacterList`.
    pub(crate) fn ok_character_list(characters: &[Character]) -> *mut Self {
        let len = u32::try_from(characters.len()).unwrap_or(u32::MAX);
        let ffi_characters: Vec<FfiCharacter> = characters
            .iter()
            .take(len as usize)
            .map(FfiCharacter::from_core)
            .collect();

        // Freed by `rm_free_result` as a boxed slice of exactly `len` items.
        let items = if ffi_characters.is_empty() {
            std::ptr::null_mut()
        } else {
            Box::into_raw(ffi_characters.into_boxed_slice()).cast::<FfiCharacter>()
        };

        let ffi_list = Box::new(FfiCharacterList { items, len });
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            0,
            FfiDataTag::CharacterList,
            Box::into_raw(ffi_list).cast(),
        )
    }

    /// Build an error result from a `FetchError`.
    pub(crate) fn from_fetch_error(err: &FetchError) -> *mut Self {
        let (error_code, http_status) = match err {
            FetchError::InvalidUrl(_) => (FfiErrorCode::InvalidUrl, 0),
            FetchError::Transport(_) => (FfiErrorCode::Transport, 0),
            FetchError::Http { status, .. } => (FfiErrorCode::Http, *status),
            FetchError::NoData => (FfiErrorCode::NoData, 0),
            FetchError::Decode { .. } => (FfiErrorCode::Decode, 0),
            FetchError::TooManyPages { .. } => (FfiErrorCode::TooManyPages, 0),
        };
        Self::error(error_code, http_status, &err.to_string())
    }

    pub(crate) fn from_storage_error(err: &StorageError) -> *mut Self {
        Self::error(FfiErrorCode::Storage, 0, &err.to_string())
    }

    pub(crate) fn not_found(what: &str) -> *mut Self {
        Self::error(FfiErrorCode::NotFound, 0, &format!("not found: {what}"))
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, 0, &format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, 0, msg)
    }

    fn error(error_code: FfiErrorCode, http_status: u16, msg: &str) -> *mut Self {
        Self::boxed(
            error_code,
            to_c_string(msg),
            http_status,
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }
}
