//! Domain entities for Kursor.
//!
//! This module contains pure business types with no infrastructure
//! dependencies: the identifiers that name a room and its two participants,
//! and the credential that guards entry to it.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of a Clean Architecture codebase is the **domain**.
//! Domain code has no imports from network libraries, databases, or UI
//! frameworks, so it compiles and tests anywhere.  The relay server and the
//! client library both depend on these types; the types never depend on them.

/// Salted password hashing for room credentials.
pub mod credential;

/// Room ids, session tokens, and participant roles.
pub mod ids;
