//! Common test infrastructure for kaboxer-image tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `mocks`: in-memory `FakeEngine` and `FakeRegistry`
//! - `mock_server`: wiremock setup helpers for registry APIs
//! - `fixtures`: descriptors, runtime settings and image archives

// Not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mock_server;
pub mod mocks;

pub use fixtures::*;
pub use mock_server::*;
pub use mocks::*;
