//! Persistence slot for the unsent input text.

use crate::error::Result;

/// A single key-value slot holding the last unsent draft.
///
/// Implementations are synchronous: a draft is a short string and writes are
/// already coalesced by the caller.
pub trait DraftStore: Send + Sync {
    /// Returns the stored draft, or `None` when the slot is empty.
    fn load(&self) -> Result<Option<String>>;

    /// Overwrites the slot.
    fn save(&self, text: &str) -> Result<()>;

    /// Empties the slot. Removing an empty slot is not an error.
    fn remove(&self) -> Result<()>;
}
