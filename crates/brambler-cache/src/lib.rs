//! # Brambler Cache
//!
//! Bulk decryption of identity mappings and the in-memory cache holding the
//! result.
//!
//! ## Overview
//!
//! Names are decrypted server-side. One decrypt-all call returns every
//! alias→original pair for a master key; after that, revealing any single
//! entity is a cache lookup with no network cost.
//!
//! ## Key Types
//!
//! - [`DecryptBoundary`] - The remote decrypt service, injected at construction
//! - [`DecryptionCache`] - Holds the mappings and runs at most one decrypt-all at a time
//! - [`DecryptOutcome`] - Whether a call was served from cache, decrypted, or discarded
//!
//! ## Concurrency
//!
//! Concurrent callers asking for the same key share one in-flight request.
//! Every request carries a token; [`DecryptionCache::invalidate`] bumps the
//! token, so a response that lands after the key changed is dropped instead
//! of populating the cache.

pub mod boundary;
pub mod cache;
pub mod error;

pub use boundary::{BoundaryError, DecryptBoundary, GENERIC_FAILURE_MESSAGE};
pub use cache::{DecryptOutcome, DecryptionCache};
pub use error::{CacheError, Result};
