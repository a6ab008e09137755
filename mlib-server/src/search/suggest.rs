//! Type-ahead tag suggestions
//!
//! Only the last token of the input is completed. A leading `-` means the user
//! is typing an exclusion, so every suggestion is returned with the marker.

use mlib_common::db::TagCount;
use std::cmp::Ordering;

/// Maximum number of suggestions returned
pub const MAX_SUGGESTIONS: usize = 10;

/// The token being completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialTerm {
    /// Prefix to match, without the exclusion marker
    pub prefix: String,
    pub exclusion: bool,
}

impl PartialTerm {
    /// Extract the last whitespace-delimited token; None for blank input
    pub fn from_input(input: &str) -> Option<Self> {
        let lowered = input.to_lowercase();
        let last = lowered.split_whitespace().last()?;
        Some(match last.strip_prefix('-') {
            Some(rest) => PartialTerm {
                prefix: rest.to_string(),
                exclusion: true,
            },
            None => PartialTerm {
                prefix: last.to_string(),
                exclusion: false,
            },
        })
    }

    /// Name as shown to the user, with `-` restored for exclusions
    pub fn display(&self, name: &str) -> String {
        if self.exclusion {
            format!("-{}", name)
        } else {
            name.to_string()
        }
    }
}

/// Alphabetical order with names starting with an apostrophe after all others
pub fn apostrophe_last(a: &str, b: &str) -> Ordering {
    (a.starts_with('\''), a).cmp(&(b.starts_with('\''), b))
}

/// Drop zero-count tags, order apostrophe-last, keep the first ten
pub fn rank_suggestions(mut candidates: Vec<TagCount>) -> Vec<TagCount> {
    candidates.retain(|c| c.count > 0);
    candidates.sort_by(|a, b| apostrophe_last(&a.name, &b.name));
    candidates.truncate(MAX_SUGGESTIONS);
    candidates
}
