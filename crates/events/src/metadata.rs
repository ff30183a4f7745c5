//! Session correlation for wellsync events.

use std::sync::OnceLock;
use uuid::Uuid;

/// Global correlation ID for the current session.
static CORRELATION_ID: OnceLock<Uuid> = OnceLock::new();

/// Get or create the correlation ID for the current session.
///
/// The same ID is returned for the lifetime of the process so every event of
/// a session can be grouped together.
#[must_use]
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

/// Set the correlation ID for the current session, e.g. to the signed-in
/// user's session id.
///
/// Only the first call wins. Returns `true` if the ID was set.
pub fn set_correlation_id(id: Uuid) -> bool {
    CORRELATION_ID.set(id).is_ok()
}
