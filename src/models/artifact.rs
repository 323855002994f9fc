use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::*;

/// The structured output of one stage, as stored in a [`Version`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "stage", content = "artifact", rename_all = "snake_case")]
pub enum StageArtifact {
    Outline(CourseOutline),
    Module(ModuleSet),
    Submodule(SubmoduleSet),
    Activity(ActivitySet),
    Reading(ReadingMaterial),
    Lecture(LectureScript),
    Quiz(QuizSet),
    Assignment(Assignment),
    MindMap(MindMap),
}

impl StageArtifact {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Outline(_) => Stage::Outline,
            Self::Module(_) => Stage::Module,
            Self::Submodule(_) => Stage::Submodule,
            Self::Activity(_) => Stage::Activity,
            Self::Reading(_) => Stage::Reading,
            Self::Lecture(_) => Stage::Lecture,
            Self::Quiz(_) => Stage::Quiz,
            Self::Assignment(_) => Stage::Assignment,
            Self::MindMap(_) => Stage::MindMap,
        }
    }

    /// The entity that owns this artifact's version chain.
    pub fn owner_id(&self) -> Uuid {
        match self {
            Self::Outline(o) => o.course_id,
            Self::Module(m) => m.course_id,
            Self::Submodule(s) => s.module_id,
            Self::Activity(a) => a.submodule_id,
            Self::Reading(r) => r.activity_id,
            Self::Lecture(l) => l.activity_id,
            Self::Quiz(q) => q.activity_id,
            Self::Assignment(a) => a.activity_id,
            Self::MindMap(m) => m.module_id,
        }
    }

    /// The condensed summary later stages use as context, if the stage has one.
    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Reading(r) => Some(&r.summary),
            Self::Lecture(l) => Some(&l.summary),
            Self::Quiz(q) => Some(&q.summary),
            Self::Assignment(a) => Some(&a.summary),
            _ => None,
        }
    }

    /// The artifact without its stage tag, as clients see it.
    pub fn to_body(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        Ok(value
            .get_mut("artifact")
            .map(serde_json::Value::take)
            .unwrap_or_default())
    }

    /// Ids of the child entities this artifact introduces.
    pub fn child_ids(&self) -> Vec<Uuid> {
        match self {
            Self::Module(m) => m.modules.iter().map(|m| m.id).collect(),
            Self::Submodule(s) => s.submodules.iter().map(|s| s.id).collect(),
            Self::Activity(a) => a.activities.iter().map(|a| a.id).collect(),
            _ => Vec::new(),
        }
    }
}
