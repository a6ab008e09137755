//! Access policy
//!
//! Pure visibility rules. Private access is a session grant, so callers pass
//! the flag from the current session on every request instead of reading it
//! from the user record.

use crate::db::{FileRecord, Note, Tag};
use serde::Serialize;

/// Identity and privileges of the caller for a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerContext {
    pub user_id: i64,
    pub username: String,
    pub is_admin: bool,
    pub has_private_access: bool,
}

/// Decide whether a content item is visible to the caller
///
/// Trashed items are never visible; private items follow the caller's
/// private-zone grant; everything else is visible.
pub fn can_view(item: &FileRecord, has_private_access: bool) -> bool {
    if item.is_deleted() {
        return false;
    }
    if item.is_private {
        return has_private_access;
    }
    true
}

/// Private tags are only shown to callers holding the private-zone grant
pub fn can_see_tag(tag: &Tag, has_private_access: bool) -> bool {
    !tag.is_private || has_private_access
}

/// Note visibility: the owner, anyone when the note is public and not
/// private, and explicitly invited users.
pub fn can_view_note(note: &Note, caller_id: i64, invited: bool) -> bool {
    note.owner_id == caller_id || (!note.is_private && note.is_public) || invited
}
