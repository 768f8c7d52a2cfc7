//! Cache inspection tools.
//!
//! Read-only views over the store registry; they never touch the network.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
