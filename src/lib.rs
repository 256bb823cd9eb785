//! # Image Generator Local Core
//!
//! Client-side state for AI image generator front-ends: the daily generation
//! quota and the history of past prompts. Both are kept in a local LMDB
//! environment and mirrored in memory for synchronous reads from the UI.
//!
//! ## Features
//!
//! - **Daily quota**: a per-day image counter that resets lazily when the
//!   local calendar date changes
//! - **Prompt history**: newest-first, capped at 50 entries, deduplicated on
//!   prompt, image count and aspect ratio
//! - **Graceful degradation**: storage failures are logged and never reach
//!   the UI; in-memory state stays authoritative for the session
//! - **FFI-ready**: every operation is exposed as a C function exchanging
//!   JSON strings, for Flutter, webview shells and other hosts
//!
//! ## Quick Start
//!
//! ```no_run
//! use imagegen_local_core::{create_studio, get_remaining_generations, record_generation};
//! use std::ffi::CString;
//!
//! let name = CString::new("ai-image-generator").unwrap();
//! let studio = create_studio(name.as_ptr());
//!
//! let status = get_remaining_generations(studio);
//! let after = record_generation(studio, 2);
//! ```
//!
//! From Rust, use [`Studio`] directly:
//!
//! ```
//! use std::rc::Rc;
//! use imagegen_local_core::{MemoryStore, Studio, StudioConfig, SystemClock};
//!
//! let mut studio = Studio::with_store(Rc::new(MemoryStore::new()), Rc::new(SystemClock), &StudioConfig::default());
//! studio.record_generation(3);
//! assert_eq!(studio.remaining_generations(), 7);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_studio`] / [`create_studio_with_config`] - Open storage and load both records
//! - [`get_remaining_generations`] - Current quota status
//! - [`can_generate`] - Whether a request for N images fits today's quota
//! - [`check_request`] - Prompt and quota guards for a request, before it is sent
//! - [`record_generation_result`] - Charge the quota and record history for a finished generation
//! - [`record_generation`] - Charge N images to today's quota
//! - [`get_history`] - All history entries, newest first
//! - [`add_history_item`] - Record a successful generation
//! - [`delete_history_item`] - Remove one entry by id
//! - [`clear_history`] - Remove every entry and the storage key
//! - [`regenerate_from_history`] - Settings of a past entry, for the prompt form
//! - [`close_studio`] - Release the instance
//! - [`free_response`] - Release a string returned by any function above

pub mod app_response;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod kv_store;
pub mod models;
pub mod quota;
pub mod studio;

pub use crate::app_response::AppResponse;
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::StudioConfig;
pub use crate::error::{GenerationError, StorageError, PROMPT_BLOCKED_ERROR_MESSAGE};
pub use crate::history::{should_insert, HistoryStore};
pub use crate::kv_store::{KeyValueStore, LmdbStore, MemoryStore};
pub use crate::models::{AspectRatio, GeneratedImage, GenerationRequest, HistoryItem, QuotaRecord};
pub use crate::quota::{QuotaStatus, QuotaTracker};
pub use crate::studio::{ImageGenerator, Studio};

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Body accepted by [`add_history_item`] and [`record_generation_result`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationPayload {
    prompt: String,
    number_of_images: u32,
    aspect_ratio: AspectRatio,
    #[serde(default)]
    images: Vec<GeneratedImage>,
}

/// Opens (or creates) `<name>.lmdb` and loads the quota and history records.
///
/// # Parameters
///
/// * `name` - A null-terminated C string with the storage name
///
/// # Returns
///
/// A pointer to a [`Studio`] on success, or a null pointer on failure. Release
/// it with [`close_studio`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use imagegen_local_core::create_studio;
///
/// let name = CString::new("ai-image-generator").unwrap();
/// let studio = create_studio(name.as_ptr());
/// assert!(!studio.is_null());
/// ```
///
/// # Errors
///
/// Returns null if the pointer is null, the name is not UTF-8 or empty, or
/// the LMDB environment cannot be opened.
///
/// # Safety
///
/// `name` must be null or point to a null-terminated string.
///
/// The returned [`Studio`] is not `Send`: it shares its store and clock
/// through `Rc`. Keep the pointer on the thread that created it and call
/// every other function from that same thread.
///
/// LMDB must not open the same environment twice in one process. Call
/// [`close_studio`] on the previous instance before opening the same name
/// again, for example on a hot restart of the host.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_studio(name: *const c_char) -> *mut Studio {
    if name.is_null() {
        warn!("Null name pointer passed to create_studio");
        return std::ptr::null_mut();
    }

    let name_str = match unsafe { CStr::from_ptr(name).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in name parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    open_studio(&StudioConfig::with_storage_name(name_str))
}

/// Like [`create_studio`], with the full [`StudioConfig`] given as JSON.
///
/// Missing fields take their defaults, so `{"storage_name": "demo"}` and
/// `{}` are both valid.
///
/// # Parameters
///
/// * `config_json` - A null-terminated C string with the config
///
/// # Returns
///
/// A pointer to a [`Studio`], or null if the JSON is malformed, the config
/// fails validation or the LMDB environment cannot be opened.
///
/// # Safety
///
/// `config_json` must be null or point to a null-terminated string. The
/// threading and reopen rules of [`create_studio`] apply.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use imagegen_local_core::create_studio_with_config;
///
/// let config = CString::new(r#"{"storage_name":"demo","daily_limit":20}"#).unwrap();
/// let studio = create_studio_with_config(config.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_studio_with_config(config_json: *const c_char) -> *mut Studio {
    if config_json.is_null() {
        warn!("Null config pointer passed to create_studio_with_config");
        return std::ptr::null_mut();
    }

    let json = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    match StudioConfig::from_json(json) {
        Ok(config) => open_studio(&config),
        Err(e) => {
            warn!("Invalid studio config JSON: {e}");
            std::ptr::null_mut()
        }
    }
}

fn open_studio(config: &StudioConfig) -> *mut Studio {
    info!("Opening studio storage '{}'", config.storage_name);
    match Studio::open(config) {
        Ok(studio) => {
            info!("✅ Studio initialized successfully");
            Box::into_raw(Box::new(studio))
        }
        Err(e) => {
            warn!("❌ Failed to initialize studio: {e}");
            warn!("Attempted path: {}.lmdb", config.storage_name);
            std::ptr::null_mut()
        }
    }
}

/// Returns the current quota as
/// `{"remainingGenerations":7,"generatedToday":3,"dailyLimit":10,"limitReached":false}`
/// inside an `Ok` response.
///
/// # Returns
///
/// `Ok` with the status, or `BadRequest` for a null state.
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], used on
/// the thread that created it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_remaining_generations(state: *mut Studio) -> *const c_char {
    let studio = match unsafe { state.as_ref() } {
        Some(s) => s,
        None => return null_state("get_remaining_generations"),
    };

    response_to_c_string(&AppResponse::json(&studio.quota().status()))
}

/// Whether `count` images can be requested right now. A null state yields `false`.
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], used on
/// the thread that created it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn can_generate(state: *mut Studio, count: u32) -> bool {
    match unsafe { state.as_ref() } {
        Some(studio) => studio.can_generate(count),
        None => {
            warn!("Null state pointer passed to can_generate");
            false
        }
    }
}

/// Runs the prompt form guards on a request before the host calls the
/// image service.
///
/// # Parameters
///
/// * `state` - Studio pointer from [`create_studio`]
/// * `json_ptr` - A null-terminated C string holding a request:
///
/// ```json
/// {"prompt": "A majestic lion wearing a crown", "numberOfImages": 2, "aspectRatio": "16:9"}
/// ```
///
/// # Returns
///
/// * `Ok` with the current quota status when the request may be sent
/// * `ValidationError` for a blank prompt or an image count outside 1-4
/// * `QuotaExceeded` when today's remaining quota cannot cover the request
/// * `SerializationError` for malformed JSON
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], used on
/// the thread that created it. `json_ptr` must be null or point to a
/// null-terminated string.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn check_request(state: *mut Studio, json_ptr: *const c_char) -> *const c_char {
    let studio = match unsafe { state.as_ref() } {
        Some(s) => s,
        None => return null_state("check_request"),
    };

    let request: GenerationRequest = match parse_json_arg(json_ptr) {
        Ok(request) => request,
        Err(error_ptr) => return error_ptr,
    };

    let response = match studio.check_request(&request) {
        Ok(()) => AppResponse::json(&studio.quota().status()),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// Books the outcome of a generation the host performed: charges the images
/// returned to today's quota and records the request in the history.
///
/// # Parameters
///
/// * `state` - Studio pointer from [`create_studio`]
/// * `json_ptr` - A null-terminated C string in the [`add_history_item`] format
///
/// # Returns
///
/// * `Ok` with the updated quota status
/// * `Blocked` when `images` is empty; nothing is charged or recorded
/// * `SerializationError` for malformed JSON
///
/// # Safety
///
/// Same pointer rules as [`check_request`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn record_generation_result(state: *mut Studio, json_ptr: *const c_char) -> *const c_char {
    let studio = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return null_state("record_generation_result"),
    };

    let payload: GenerationPayload = match parse_json_arg(json_ptr) {
        Ok(p) => p,
        Err(error_ptr) => return error_ptr,
    };

    let request = GenerationRequest::new(payload.prompt, payload.number_of_images, payload.aspect_ratio);
    let response = match studio.complete_generation(&request, &payload.images) {
        Ok(()) => AppResponse::json(&studio.quota().status()),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// Charges `count` images to today's quota and returns the updated status.
///
/// Storage failures are logged only; the returned status reflects the
/// in-memory count either way.
///
/// # Parameters
///
/// * `state` - Studio pointer from [`create_studio`]
/// * `count` - Images to charge; `0` changes nothing
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], used on
/// the thread that created it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn record_generation(state: *mut Studio, count: u32) -> *const c_char {
    let studio = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return null_state("record_generation"),
    };

    studio.record_generation(count);
    response_to_c_string(&AppResponse::json(&studio.quota().status()))
}

/// Returns every history entry, newest first, as a JSON array.
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], used on
/// the thread that created it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_history(state: *mut Studio) -> *const c_char {
    let studio = match unsafe { state.as_ref() } {
        Some(s) => s,
        None => return null_state("get_history"),
    };

    response_to_c_string(&AppResponse::json(studio.history().history()))
}

/// Records a successful generation in the history.
///
/// # JSON Format
///
/// ```json
/// {
///   "prompt": "A majestic lion wearing a crown",
///   "numberOfImages": 2,
///   "aspectRatio": "16:9",
///   "images": [{"src": "data:image/jpeg;base64,...", "prompt": "A majestic lion wearing a crown"}]
/// }
/// ```
///
/// # Returns
///
/// `Ok` with the new entry, or `Ok("null")` when nothing was added because
/// `images` was empty or an entry with the same settings already exists.
/// `SerializationError` for malformed JSON.
///
/// # Safety
///
/// Same pointer rules as [`check_request`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_history_item(state: *mut Studio, json_ptr: *const c_char) -> *const c_char {
    let studio = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return null_state("add_history_item"),
    };

    let payload: GenerationPayload = match parse_json_arg(json_ptr) {
        Ok(p) => p,
        Err(error_ptr) => return error_ptr,
    };

    let added = studio.add_history_item(
        &payload.prompt,
        payload.number_of_images,
        payload.aspect_ratio,
        &payload.images,
    );
    response_to_c_string(&AppResponse::json(&added))
}

/// Removes the history entry with `id`.
///
/// # Returns
///
/// `Ok` when an entry was removed, `NotFound` otherwise.
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], used on
/// the thread that created it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_history_item(state: *mut Studio, id: i64) -> *const c_char {
    let studio = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return null_state("delete_history_item"),
    };

    let response = if studio.delete_history_item(id) {
        AppResponse::success("History item deleted successfully")
    } else {
        AppResponse::NotFound(format!("No history item found with id: {id}"))
    };
    response_to_c_string(&response)
}

/// Removes every history entry and the history storage key.
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], used on
/// the thread that created it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_history(state: *mut Studio) -> *const c_char {
    let studio = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return null_state("clear_history"),
    };

    studio.clear_history();
    response_to_c_string(&AppResponse::success("History cleared successfully"))
}

/// Returns `{"prompt", "numberOfImages", "aspectRatio"}` of the entry with
/// `id`, so the host can pre-fill its prompt form.
///
/// # Returns
///
/// `Ok` with the request, or `NotFound` for an unknown id.
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], used on
/// the thread that created it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn regenerate_from_history(state: *mut Studio, id: i64) -> *const c_char {
    let studio = match unsafe { state.as_ref() } {
        Some(s) => s,
        None => return null_state("regenerate_from_history"),
    };

    let response = match studio.regenerate_from_history(id) {
        Some(request) => AppResponse::json(&request),
        None => AppResponse::NotFound(format!("No history item found with id: {id}")),
    };
    response_to_c_string(&response)
}

/// Releases a studio created by [`create_studio`] or [`create_studio_with_config`].
///
/// The LMDB environment is closed when the instance is dropped, so the same
/// storage name can be opened again afterwards.
///
/// # Safety
///
/// `state` must be null or a live pointer from [`create_studio`], closed at
/// most once, on the thread that created it. It must not be used afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_studio(state: *mut Studio) -> *const c_char {
    if state.is_null() {
        return null_state("close_studio");
    }

    drop(unsafe { Box::from_raw(state) });
    info!("Studio closed");
    response_to_c_string(&AppResponse::success("Studio closed successfully"))
}

/// Frees a string returned by one of the functions above. Null is ignored.
///
/// # Safety
///
/// `ptr` must come from this library and be freed at most once.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr as *mut c_char) });
}

fn null_state(function: &str) -> *const c_char {
    let error = AppResponse::BadRequest(format!("Null state pointer passed to {function}"));
    response_to_c_string(&error)
}

/// Serializes `response` into a heap C string owned by the caller.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Reads a JSON C string argument into `T`.
///
/// Pointer problems become `BadRequest`, parse failures `SerializationError`.
fn parse_json_arg<T: DeserializeOwned>(ptr: *const c_char) -> Result<T, *const c_char> {
    let json_str = c_ptr_to_string(ptr, "JSON")?;
    serde_json::from_str(&json_str).map_err(|e| {
        let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
        response_to_c_string(&error)
    })
}

/// Converts a C string pointer to an owned `String`.
///
/// On a null pointer or invalid UTF-8 the error side carries a ready-made
/// `BadRequest` response naming `field_name`.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
