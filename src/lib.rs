//! course-forge: a course authoring backend that drafts outlines, modules,
//! activities and their content with a language model, and keeps every
//! generated artifact in an append-only version history.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod suggest;
