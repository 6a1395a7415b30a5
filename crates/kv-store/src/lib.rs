//! Key-value state store for the OAuth redirect flow
//!
//! Bridges the two legs of the authorization redirect (the PKCE session is
//! written when the flow begins and read back on the callback) and holds the
//! resulting tokens. The orchestrator only relies on get/put/delete with
//! last-write-wins semantics per key; backends decide durability.
//!
//! Entries may carry a time-to-live. Expired entries read as absent and are
//! purged lazily on the next write.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{Error, Result};
pub use file::FileStore;
pub use memory::MemoryStore;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by `KvStore` methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// String-to-string store shared by all request handlers.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn KvStore>`).
pub trait KvStore: Send + Sync {
    /// Backend name for logging ("memory", "file").
    fn backend(&self) -> &str;

    /// Read a value. Missing and expired keys both return `None`.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    /// Write a value, replacing any previous one. `ttl: None` never expires.
    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()>;

    /// Remove a key. Removing a missing key is not an error.
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}
