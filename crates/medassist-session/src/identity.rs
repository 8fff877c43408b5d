//! Guest identity

use medassist_core::{StateStorage, StorageError};
use tracing::info;
use uuid::Uuid;

/// Storage key of the guest identity
pub const GUEST_ID_KEY: &str = "guestId";

/// Return the stored guest id, generating and saving one on first run.
pub fn guest_id(storage: &dyn StateStorage) -> Result<String, StorageError> {
    if let Some(existing) = storage.load(GUEST_ID_KEY)? {
        let existing = existing.trim().trim_matches('"').to_string();
        if !existing.is_empty() {
            return Ok(existing);
        }
    }

    let id = Uuid::new_v4().to_string();
    storage.save(GUEST_ID_KEY, &id)?;
    info!(guest_id = %id, "Generated guest identity");
    Ok(id)
}
