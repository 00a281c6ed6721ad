//! Storage abstraction for the ParcelTrack client.
//!
//! This crate provides:
//! - A `KeyValueStore` trait over the persistent namespace shared by
//!   every client process of the same user
//! - A file-backed implementation (`FileStore`) and an in-memory one
//!   (`MemoryStore`)
//! - `TokenStore`, the sole owner of credentials and the cached user
//!   profile, which fails open to "no token" on storage errors
//! - `SessionFlagStore`, process-lifetime flags used to distinguish a
//!   first load from a reload

mod file;
mod flags;
mod keys;
mod memory;
mod profile;
mod tokens;
mod traits;

pub use file::FileStore;
pub use flags::SessionFlagStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use profile::{UserProfile, UserRole};
pub use tokens::TokenStore;
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying store is unreachable or corrupt
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
