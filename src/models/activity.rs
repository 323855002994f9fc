use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of learning activity.
///
/// Serialized with the human-readable names the model is asked to use
/// (`"Reading Material"` rather than `reading_material`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum ActivityType {
    Lecture,
    Quiz,
    Assessment,
    #[serde(rename = "Reading Material")]
    ReadingMaterial,
    Lab,
}

impl ActivityType {
    pub const ALL: [ActivityType; 5] = [
        Self::Lecture,
        Self::Quiz,
        Self::Assessment,
        Self::ReadingMaterial,
        Self::Lab,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lecture => "Lecture",
            Self::Quiz => "Quiz",
            Self::Assessment => "Assessment",
            Self::ReadingMaterial => "Reading Material",
            Self::Lab => "Lab",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub objective: String,
    pub activity_type: ActivityType,
}

/// The ordered activities of one submodule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivitySet {
    pub submodule_id: Uuid,
    pub activities: Vec<Activity>,
}

impl ActivitySet {
    pub fn find(&self, id: Uuid) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }
}

/// What the instructor wants from activity generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityPreferences {
    /// Preferred types. Empty means any of [`ActivityType::ALL`].
    #[serde(default)]
    pub activity_types: Vec<ActivityType>,
    #[serde(default)]
    pub instructions: Option<String>,
}
