//! Tag Query Engine: search and type-ahead suggestions

pub mod engine;
pub mod query;
pub mod suggest;

pub use engine::{search_files, suggest_tags, SearchScope};
pub use query::{SortKey, TagQuery};
