//! # Brambler Testkit
//!
//! Testing utilities for Brambler.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A session wired to in-memory backends, an in-memory
//!   decrypt service, and switchable principals
//! - **Generators**: Proptest strategies for keys, entities and mappings
//!
//! ## Test Fixtures
//!
//! ```rust
//! use brambler_testkit::fixtures::{TestFixture, KEY_1};
//!
//! # async fn example() {
//! let fixture = TestFixture::with_key(KEY_1).await;
//! fixture.act_as_stranger();
//! assert!(fixture.brambler.reveal_all().await.is_err());
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use brambler_testkit::generators::master_key;
//!
//! proptest! {
//!     #[test]
//!     fn any_key_is_accepted(key in master_key()) {
//!         prop_assert!(brambler::MasterKey::new(key).is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{Observed, TestFixture};
