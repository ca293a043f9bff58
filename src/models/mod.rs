//! Domain models for ainit.
//!
//! # Core Concepts
//!
//! ## Registry Entities
//!
//! - [`Fragment`]: An immutable, slug-addressed block of text. Ignore templates and
//!   guardrail technologies live in separate namespaces.
//! - [`Category`]: A fixed guardrail grouping with one generic rules document.
//! - [`GuardrailsIndex`]: The category and technology listing for the rules path.
//!
//! ## Request Entities
//!
//! These are derived per request and never persisted:
//!
//! - [`SelectionState`]: What the caller asked for (slugs, categories, format, shell).
//! - [`ComposedDocument`]: The merged output, prior to format-specific rendering.

mod document;
mod format;
mod fragment;
mod selection;

pub use document::*;
pub use format::*;
pub use fragment::*;
pub use selection::*;
