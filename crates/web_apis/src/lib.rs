//! Web Storage for the API client.
//!
//! Provides the `localStorage` stand-in used to cache per-user data
//! between requests.

pub mod storage;

pub use storage::{LocalStorage, MemoryStorage, Storage, StorageError};
