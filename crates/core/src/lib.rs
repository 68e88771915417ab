//! Domain types and pure logic for the Verdant administration backend.
//!
//! The bulk import pipeline lives in [`import`]. Everything here is free of
//! HTTP and SQL concerns; storage is reached through the
//! [`import::store::ImportStore`] trait.

pub mod credentials;
pub mod error;
pub mod import;
pub mod roles;
pub mod types;
