//! Snapshot persistence of aggregate state in a key-value slot.
//!
//! The whole state is written as one compact JSON document under a fixed
//! key after every mutation. Reading it back is forgiving: an empty slot,
//! unparsable JSON, or a document that fails the aggregate's invariants all
//! count as "nothing saved".

use std::io;

use crate::aggregate::Aggregate;
use crate::storage::KeyValueStorage;

/// Key the cart is stored under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "cart";

/// Serialize `state` and write it to `key`.
///
/// # Errors
///
/// Returns `io::Error` if serialization or the storage write fails.
pub fn save_snapshot<A: Aggregate>(
    storage: &dyn KeyValueStorage,
    key: &str,
    state: &A,
) -> io::Result<()> {
    let json =
        serde_json::to_string(state).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    storage.set(key, &json)
}

/// Read the state stored under `key`.
///
/// # Returns
///
/// - `Ok(Some(state))` if the slot holds a valid document.
/// - `Ok(None)` if the slot is empty, the JSON does not parse, or the decoded
///   state fails [`Aggregate::validate`]. The latter two are logged as
///   warnings via `tracing::warn!`.
///
/// # Errors
///
/// Returns `io::Error` only when the storage read itself fails.
pub fn load_snapshot<A: Aggregate>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> io::Result<Option<A>> {
    let Some(json) = storage.get(key)? else {
        return Ok(None);
    };

    let state = match serde_json::from_str::<A>(&json) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(
                key,
                error = %e,
                "failed to deserialize snapshot; starting empty"
            );
            return Ok(None);
        }
    };

    if let Err(e) = state.validate() {
        tracing::warn!(
            key,
            error = %e,
            "snapshot violates invariants; starting empty"
        );
        return Ok(None);
    }
    Ok(Some(state))
}
