//! Domain models for course-forge.
//!
//! # Core Concepts
//!
//! ## Client-authored
//!
//! - [`CourseInit`]: the instructor's course description. Stored once, never mutated.
//!
//! ## Generated artifacts
//!
//! Every stage of the pipeline produces one [`StageArtifact`]:
//!
//! - [`CourseOutline`], owned by the course.
//! - [`ModuleSet`], owned by the course.
//! - [`SubmoduleSet`] and [`MindMap`], owned by a module.
//! - [`ActivitySet`], owned by a submodule.
//! - [`ReadingMaterial`], [`LectureScript`], [`QuizSet`] and [`Assignment`], owned by an activity.
//!
//! ## History
//!
//! - [`Version`]: an immutable snapshot of an artifact. Versions of one
//!   (entity, stage) pair form an append-only chain; one of them is "latest".

mod activity;
mod artifact;
mod content;
mod course;
mod module;
mod suggestion;
mod version;

pub use activity::*;
pub use artifact::*;
pub use content::*;
pub use course::*;
pub use module::*;
pub use suggestion::*;
pub use version::*;
