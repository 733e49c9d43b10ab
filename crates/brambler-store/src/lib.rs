//! # Brambler Store
//!
//! Durable custody of the master key across heterogeneous backends.
//!
//! ## Overview
//!
//! Backends implement the small [`KeyBackend`] trait (`get`, `set`,
//! `remove`, `is_supported`). [`KeyPersistence`] walks an ordered list of
//! backends: the account-synced cloud store first, the device-local store
//! last. Callers only ever see the resulting [`MasterKeyRecord`] and its
//! `source` tag.
//!
//! ## Key Types
//!
//! - [`KeyBackend`] - The async trait every backend implements
//! - [`CloudBackend`] - Version-gated adapter over a platform [`CloudKv`] client
//! - [`SqliteBackend`] - Device-local persistent backend
//! - [`MemoryBackend`] - In-memory backend for tests and ephemeral sessions
//! - [`KeyPersistence`] - The fallback chain
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use brambler_store::{KeyBackend, KeyPersistence, MemoryBackend, SqliteBackend};
//! use brambler_core::KeySource;
//!
//! async fn example() {
//!     let cloud: Arc<dyn KeyBackend> = Arc::new(MemoryBackend::new(KeySource::Cloud));
//!     let local: Arc<dyn KeyBackend> = Arc::new(SqliteBackend::open("brambler.db").unwrap());
//!     let persistence = KeyPersistence::new("brambler_master_key", vec![cloud, local]);
//!
//!     let record = persistence.save("correct horse").await.unwrap();
//!     println!("saved to {}", record.source);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Transparent fallback**: a failing cloud write is retried once against
//!   the local backend; only total failure is an error.
//! - **Absence is not failure**: `load` returns `None` when no backend holds
//!   a record.
//! - **Partial clears are reported**: `clear` lists every backend it cleared,
//!   including when another backend failed.

pub mod cloud;
pub mod error;
pub mod memory;
pub mod migration;
pub mod persistence;
pub mod sqlite;
pub mod traits;

pub use brambler_core::{KeySource, MasterKeyRecord};
pub use cloud::{CloudBackend, CloudKv, CloudKvError, PlatformVersion};
pub use error::{BackendFailure, Result, StoreError};
pub use memory::MemoryBackend;
pub use persistence::{ClearReport, KeyPersistence};
pub use sqlite::SqliteBackend;
pub use traits::KeyBackend;
