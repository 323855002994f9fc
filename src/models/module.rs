use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A top-level unit of a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Module {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Estimated effort, e.g. "8 hours".
    pub hours: String,
}

/// The ordered modules of one course.
///
/// Module ids are unique within a set. They are minted when a module first
/// appears and carried forward by redos that keep the module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleSet {
    pub course_id: Uuid,
    pub modules: Vec<Module>,
}

impl ModuleSet {
    pub fn find(&self, id: Uuid) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submodule {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

/// The ordered submodules of one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmoduleSet {
    pub module_id: Uuid,
    pub submodules: Vec<Submodule>,
}

impl SubmoduleSet {
    pub fn find(&self, id: Uuid) -> Option<&Submodule> {
        self.submodules.iter().find(|s| s.id == id)
    }
}
