//! Prompt builders, one per stage.

use super::ContentContext;
use crate::models::*;

pub fn system(stage: Stage) -> &'static str {
    match stage {
        Stage::Outline => "You are an expert course design assistant.",
        Stage::Module | Stage::Submodule | Stage::Activity => {
            "You are a highly skilled instructional designer."
        }
        Stage::Reading => "You are an expert educator writing reading material for students.",
        Stage::Lecture => "You are a skilled educator and video content designer.",
        Stage::Quiz => "You are a quiz designer for an educational system.",
        Stage::Assignment => "You are a course designer writing integrative assignments.",
        Stage::MindMap => "You are a mind mapping assistant.",
    }
}

fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "- None".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn outline_to_text(outline: &CourseOutline) -> String {
    format!(
        "Title: {}\nDescription: {}\nPrerequisites:\n{}\nLearning outcomes:\n{}\nDuration: {}\nCredits: {}",
        outline.title,
        outline.description,
        bullets(&outline.prerequisites),
        bullets(&outline.learning_outcomes),
        outline.duration,
        outline.credits,
    )
}

fn submodules_to_bullets(submodules: &[Submodule]) -> String {
    submodules
        .iter()
        .map(|s| format!("- {}: {}", s.title, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn outline(course: &CourseInit) -> String {
    format!(
        r#"Based on the following inputs, generate a detailed course outline.

INPUTS:
- Title: {title}
- Prerequisites: {prerequisites}
- Description: {description}
- Learning objectives: {objectives}
- Target audience: {audience}
- Duration: {duration}
- Credits: {credits}

INSTRUCTIONS:
1) Translate the instructor's learning objectives into measurable, student-centred learning outcomes ("Students will be able to ...").
2) Elaborate the description so it covers the broad topics, the focus and the prerequisites. Do not add content the inputs do not support.
3) Keep outcomes and description appropriate for the target audience.
4) Repeat duration and credits exactly as given. Do not break them down.
5) Return learning_outcomes, never learning_objectives."#,
        title = course.title,
        prerequisites = course.prerequisites.join(", "),
        description = course.description,
        objectives = course.learning_objectives.join(", "),
        audience = course.target_audience,
        duration = course.duration,
        credits = course.credits,
    )
}

pub fn modules(outline: &CourseOutline, count: Option<usize>) -> String {
    let (heading, requirement) = match count {
        Some(count) => (
            format!("generate {count} course modules"),
            format!("Create {count} modules, ordered from basic to advanced."),
        ),
        None => (
            "generate course modules".to_string(),
            "Order the modules from basic to advanced.".to_string(),
        ),
    };
    format!(
        r#"Based on the following course outline, {heading} that progressively build upon each other.

COURSE OUTLINE:
{outline}

REQUIREMENTS:
- {requirement}
- Distribute content evenly and align with the learning outcomes.
- Consider the target audience and prerequisites.
- Each module has a clear title, a description of its content and goals, and a realistic hours estimate (e.g. "8 hours")."#,
        outline = outline_to_text(outline),
    )
}

pub fn submodules(outline: &CourseOutline, module: &Module) -> String {
    format!(
        r#"Generate the submodules of one course module.

Course outline:
{outline}

Module: {title}
Module description: {description}
Module effort: {hours}
Course credits: {credits}

Each submodule is a logically scoped unit of learning with a clear title and a short, beginner-friendly description of 2-3 lines. Scale the number and depth of submodules with the module's effort and the course credits."#,
        outline = outline_to_text(outline),
        title = module.title,
        description = module.description,
        hours = module.hours,
        credits = outline.credits,
    )
}

pub fn activities(submodule: &Submodule, preferences: &ActivityPreferences) -> String {
    let types = if preferences.activity_types.is_empty() {
        ActivityType::ALL.to_vec()
    } else {
        preferences.activity_types.clone()
    };
    let types = types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Generate learning activities for a course submodule.

- Submodule: {title}
- Submodule description: {description}
- Preferred activity types: {types}
- Instructor instructions: {instructions}

Guidelines when no instructions are given:
- Make activities clear, beginner-friendly and aligned with the submodule's goal.
- Mix conceptual understanding with applied thinking.
- Avoid duplication across types. Several activities may share a type.

Every activity has a name, a short description, a specific objective and an activity_type taken from the preferred types."#,
        title = submodule.title,
        description = submodule.description,
        instructions = preferences
            .instructions
            .as_deref()
            .unwrap_or("None provided"),
    )
}

pub fn content_header(context: &ContentContext) -> String {
    format!(
        "Course outline:\n{}\n\nModule: {}\nSubmodule: {}\nActivity: {} ({})\nActivity objective: {}",
        outline_to_text(&context.outline),
        context.module.title,
        context.submodule.title,
        context.activity.name,
        context.activity.activity_type.as_str(),
        context.activity.objective,
    )
}

pub fn reading(
    context: &ContentContext,
    user_prompt: &str,
    previous_summary: &str,
    source_context: &str,
) -> String {
    format!(
        r#"Create reading material for the following submodule.

{header}

User prompt: {user_prompt}
Previous material summary: {previous_summary}

Context from instructor sources:
{sources}

Write a markdown reading passage that:
- aligns with the course outline and avoids repeating earlier material,
- explains the topic clearly with examples, analogies, code snippets or formulas where relevant,
- shows practical applications and how the submodule connects to the course,
- suggests where images or graphs would help,
- ends with a brief summary."#,
        header = content_header(context),
        previous_summary = or_none(previous_summary),
        sources = if source_context.is_empty() {
            "No additional context provided."
        } else {
            source_context
        },
    )
}

pub fn lecture(
    context: &ContentContext,
    user_prompt: &str,
    previous_summary: &str,
    source_text: &str,
    examples: &[String],
    duration_minutes: Option<u32>,
) -> String {
    format!(
        r#"Create a lecture script for a video lesson.

{header}

User prompt: {user_prompt}
Target duration: {duration} minutes

Summaries of recent activities:
{previous_summary}

Instructor material:
{sources}

Examples:
{examples}

Return a markdown lecture script with speaker notes, explanation points, examples, hooks and summarizing closures. Pace it for the target duration."#,
        header = content_header(context),
        duration = duration_minutes
            .map(|d| d.to_string())
            .unwrap_or_else(|| "Not specified".to_string()),
        previous_summary = or_none(previous_summary),
        sources = or_none(source_text),
        examples = if examples.is_empty() {
            "None".to_string()
        } else {
            bullets(examples)
        },
    )
}

pub fn quiz(
    context: &ContentContext,
    user_prompt: &str,
    material_summary: &str,
    spec: &QuizSpec,
) -> String {
    let format_rule = match spec.quiz_type {
        QuizType::MultipleChoice => {
            "Each question has exactly 4 options and the answer is the text of the correct option."
        }
        QuizType::TrueFalse => {
            "Questions are unambiguous statements, options are omitted and the answer is \"True\" or \"False\"."
        }
    };
    format!(
        r#"Generate a quiz for the submodule "{submodule}" of the module "{module}".

Material summary:
{material_summary}

Guidelines:
- Create exactly {count} questions of type {quiz_type}.
- {format_rule}
- Each question includes a short explanation of the correct answer.
- Keep questions beginner-friendly and focused on conceptual clarity.
- Follow this instruction: {user_prompt}"#,
        submodule = context.submodule.title,
        module = context.module.title,
        count = spec.number_of_questions,
        quiz_type = spec.quiz_type.as_str(),
    )
}

pub fn assignment(context: &ContentContext, user_prompt: &str, submodules: &[Submodule]) -> String {
    format!(
        r#"Create an assignment that integrates the concepts of this module and assesses practical and conceptual understanding.

{header}

User prompt: {user_prompt}

Submodules of the module:
{submodules}

Return markdown with: Assignment Title, Description, Objectives, Deliverables, Evaluation Criteria."#,
        header = content_header(context),
        submodules = submodules_to_bullets(submodules),
    )
}

pub fn mind_map(module: &Module, submodules: &[Submodule]) -> String {
    format!(
        r#"Create a mind map for the module "{title}" capturing its main themes, concepts and their relationships.

Module description: {description}

Submodules:
{submodules}

Return a markdown mind map using nested bullet points."#,
        title = module.title,
        description = module.description,
        submodules = submodules_to_bullets(submodules),
    )
}

pub fn summarize(text: &str, label: &str) -> String {
    format!(
        "Summarize the following {label} in concise, factual bullet points covering the key ideas only. Avoid examples and repetition.\n\n{text}"
    )
}

/// Appended to a stage prompt when regenerating from a previous artifact.
pub fn revision(previous_json: &str, feedback: &str) -> String {
    let request = if feedback.trim().is_empty() {
        "No change was requested. Return the result as it is.".to_string()
    } else {
        format!("The user asked for this change:\n\"{feedback}\"")
    };
    format!(
        r#"

REVISION:
You previously produced the following result:
{previous_json}

{request}

Revise the result according to the request:
- Do not discard content the request does not target.
- Change the number of items only if the request or the structure requires it.
- Keep the "id" of every item you keep. Omit "id" for new items. Never give two items the same id.
- Return the complete revised result in the same format."#
    )
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "None"
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn init() -> CourseInit {
        CourseInit {
            id: Uuid::new_v4(),
            title: "Intro to Graphs".to_string(),
            prerequisites: vec!["Discrete math".to_string()],
            description: "Graph basics".to_string(),
            learning_objectives: vec!["understand traversal".to_string()],
            target_audience: "Undergraduates".to_string(),
            duration: "6 weeks".to_string(),
            credits: 3,
        }
    }

    #[test]
    fn outline_prompt_carries_every_input_field() {
        let prompt = outline(&init());
        for needle in [
            "Intro to Graphs",
            "Discrete math",
            "Graph basics",
            "understand traversal",
            "Undergraduates",
            "6 weeks",
            "Credits: 3",
        ] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn activities_prompt_defaults_to_all_types() {
        let submodule = Submodule {
            id: Uuid::new_v4(),
            title: "BFS".to_string(),
            description: "Breadth-first search".to_string(),
        };
        let prompt = activities(&submodule, &ActivityPreferences::default());
        assert!(prompt.contains("Lecture, Quiz, Assessment, Reading Material, Lab"));
        assert!(prompt.contains("None provided"));
    }

    #[test]
    fn revision_embeds_previous_result_and_feedback() {
        let section = revision("{\"modules\": []}", "split module 2");
        assert!(section.contains("{\"modules\": []}"));
        assert!(section.contains("\"split module 2\""));
        assert!(section.contains("Keep the \"id\""));
    }

    #[test]
    fn blank_feedback_asks_for_no_change() {
        let section = revision("{\"modules\": []}", "  ");
        assert!(section.contains("No change was requested"));
        assert!(!section.contains("The user asked"));
    }

    #[test]
    fn module_count_is_only_pinned_when_given() {
        let outline = CourseOutline {
            course_id: Uuid::new_v4(),
            title: "Intro to Graphs".to_string(),
            prerequisites: vec![],
            description: "Graph basics".to_string(),
            learning_outcomes: vec![],
            duration: "6 weeks".to_string(),
            credits: 3,
        };
        assert!(modules(&outline, Some(3)).contains("Create 3 modules"));
        let open = modules(&outline, None);
        assert!(!open.contains("Create"));
        assert!(open.contains("generate course modules"));
    }
}
