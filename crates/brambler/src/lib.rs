//! # Brambler
//!
//! Client-side custody of an owner's master key, cached bulk decryption of
//! anonymized names, and the visibility controls built on top.
//!
//! ## Overview
//!
//! Participants and items are shown under public aliases. The owner holds a
//! master key that the remote service uses to decrypt every alias at once.
//! A [`Brambler`] session:
//!
//! - **Keeps the key**: saved to the cloud-synced store when the platform
//!   supports it, otherwise on the device
//! - **Caches the mappings**: one decrypt-all per key, shared by every reveal
//! - **Controls visibility**: reveal everything, or individual entities
//! - **Gates everything on ownership**: non-owners get `PermissionDenied`
//!   with no side effects
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use brambler::{Brambler, BramblerConfig, EntityId};
//! use brambler::cache::boundary::memory::MemoryBoundary;
//! use brambler::perms::StaticPrincipals;
//! use brambler::store::cloud::memory::MemoryCloudKv;
//!
//! async fn example() {
//!     let brambler = Brambler::open(
//!         BramblerConfig::default(),
//!         MemoryCloudKv::new("7.0"),
//!         Arc::new(MemoryBoundary::new()),
//!         Arc::new(StaticPrincipals::owner("owner-1")),
//!     )
//!     .unwrap();
//!
//!     brambler.auto_load().await.unwrap();
//!     brambler.save_master_key("correct horse").await.unwrap();
//!
//!     let otter = EntityId::participant("42");
//!     brambler.toggle_entity(&otter).await.unwrap();
//!     println!("{}", brambler.display_name(&otter, "Quiet Otter"));
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `brambler::core` - Keys, records, mappings, visibility state
//! - `brambler::store` - Key backends and the fallback chain
//! - `brambler::perms` - Owner gate
//! - `brambler::cache` - Decrypt boundary and cache

pub mod config;
pub mod error;
pub mod session;

pub use brambler_cache as cache;
pub use brambler_core as core;
pub use brambler_perms as perms;
pub use brambler_store as store;

pub use config::BramblerConfig;
pub use error::{BramblerError, Result};
pub use session::Brambler;

pub use brambler_core::{
    EntityId, IdentityMappings, KeySource, MappingKind, MasterKey, Visibility, VisibilityState,
};
pub use brambler_store::ClearReport;
