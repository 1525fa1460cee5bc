//! String formatting utilities.
//!
//! Helpers for keeping identifiers readable in structured log output.

/// Truncates a long identifier for display purposes.
///
/// Item ids from upstream are UUID-sized; logs show only the first 8
/// characters followed by "..".
pub fn short_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}
