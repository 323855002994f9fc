use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StageArtifact;

/// One phase of the course-authoring pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Outline,
    Module,
    Submodule,
    Activity,
    Reading,
    Lecture,
    Quiz,
    Assignment,
    MindMap,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Self::Outline,
        Self::Module,
        Self::Submodule,
        Self::Activity,
        Self::Reading,
        Self::Lecture,
        Self::Quiz,
        Self::Assignment,
        Self::MindMap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outline => "outline",
            Self::Module => "module",
            Self::Submodule => "submodule",
            Self::Activity => "activity",
            Self::Reading => "reading",
            Self::Lecture => "lecture",
            Self::Quiz => "quiz",
            Self::Assignment => "assignment",
            Self::MindMap => "mind_map",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "outline" => Some(Self::Outline),
            "module" => Some(Self::Module),
            "submodule" => Some(Self::Submodule),
            "activity" => Some(Self::Activity),
            "reading" => Some(Self::Reading),
            "lecture" => Some(Self::Lecture),
            "quiz" => Some(Self::Quiz),
            "assignment" => Some(Self::Assignment),
            "mind_map" => Some(Self::MindMap),
            _ => None,
        }
    }
}

/// How a version came to exist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Initial,
    Redo,
    Rollback,
}

impl VersionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Redo => "redo",
            Self::Rollback => "rollback",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(Self::Initial),
            "redo" => Some(Self::Redo),
            "rollback" => Some(Self::Rollback),
            _ => None,
        }
    }
}

/// An immutable snapshot of a stage artifact.
///
/// Versions of one (entity, stage) pair form a singly-linked list through
/// `previous_version_id`, rooted at the entity's first generation. Nothing
/// is ever updated or deleted; a rollback appends a copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Version {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub stage: Stage,
    pub kind: VersionKind,
    pub previous_version_id: Option<Uuid>,
    /// Human-readable label, e.g. `redo-module-20261016T101500.123456Z`.
    pub tag: String,
    pub artifact: StageArtifact,
    pub created_at: DateTime<Utc>,
}

/// Builds the auto-tag for a new version.
pub fn auto_tag(kind: VersionKind, stage: Stage, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}",
        kind.as_str(),
        stage.as_str(),
        at.format("%Y%m%dT%H%M%S%.6fZ")
    )
}
