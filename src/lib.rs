//! Composes AI-tool ignore files and guardrail rule files from reusable,
//! slug-addressed fragments, delivered as text or as installer scripts.

pub mod api;
pub mod compose;
pub mod config;
pub mod engine;
pub mod models;
pub mod query;
pub mod registry;
pub mod render;
pub mod sections;
