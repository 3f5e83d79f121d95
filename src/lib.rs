//! Dotveil - keep secrets out of your dotfiles repository.
//!
//! This library provides the core functionality for dotveil, including:
//! - A catalog of secret detection patterns
//! - Scanning file contents for likely secrets
//! - Redacting detected values into reversible `{{NAME}}` placeholders
//! - Restoring placeholders from pluggable secret backends
//! - A local, owner-only secret store and backend mappings

pub mod backend;
pub mod cfg;
pub mod fsutil;
pub mod patterns;
pub mod placeholder;
pub mod redact;
pub mod restore;
pub mod scan;
pub mod store;
pub mod ui;
