//! Content Store queries
//!
//! Each submodule owns the statements for one group of tables. Functions take
//! the pool explicitly and return `mlib_common::Result`.

pub mod favorites;
pub mod files;
pub mod notes;
pub mod playlists;
pub mod tags;
pub mod users;
