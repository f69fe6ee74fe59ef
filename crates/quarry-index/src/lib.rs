//! Package index client for Quarry
//!
//! This crate provides the blocking HTTP session used to talk to a package
//! index, the legacy XML-RPC transport and codec, typed index queries built on
//! top of them, and a TTL cache for release listings.

pub mod api;
pub mod cache;
pub mod client;
pub mod transport;
pub mod xmlrpc;

// Re-export main types
pub use api::{ReleaseFile, SearchHit};
pub use cache::{CacheEntry, CacheStats, ReleaseCache};
pub use client::{raise_for_status, AuthConfig, IndexSession, RetryConfig, SessionConfig};
pub use transport::{IndexProxy, XmlRpcTransport};
pub use xmlrpc::Value;

use quarry_core::error::QuarryError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, QuarryError>;
