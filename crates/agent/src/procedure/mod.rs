//! eIM-driven procedures
//!
//! Each procedure drives the card through [`crate::euicc::EuiccInterface`]
//! and the eIM through [`crate::esipa::EimLink`], so either end can be
//! substituted in tests. Procedures own the ordering and cross-check rules;
//! the adapters below them own the byte formats.

pub mod auth;
pub mod cancel;
pub mod download;
pub mod notification;
pub mod package;
pub mod retrieval;
