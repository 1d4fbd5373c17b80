use std::sync::Arc;

use super::accumulator::FileCollection;
use crate::remote::FileRecord;

/// Character position taken from each path.
pub const HIDDEN_KEY_INDEX: usize = 1;

/// Derive the CDN hidden key from a collection.
///
/// Empty until the collection is ready. Paths too short to have a character
/// at [`HIDDEN_KEY_INDEX`] contribute nothing.
pub fn derive_hidden_key(collection: &FileCollection) -> String {
    hidden_key_of(collection.visible())
}

/// Concatenate the [`HIDDEN_KEY_INDEX`]-th character of every path, in order.
pub fn hidden_key_of(files: &[Arc<FileRecord>]) -> String {
    files
        .iter()
        .filter_map(|f| f.path.chars().nth(HIDDEN_KEY_INDEX))
        .collect()
}
