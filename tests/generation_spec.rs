use std::collections::HashSet;
use std::sync::Arc;

use course_forge::generation::{ContentContext, GenerationError, StageGenerator, StageInput};
use course_forge::llm::{LlmError, ScriptedService};
use course_forge::models::*;
use serde_json::json;
use uuid::Uuid;

fn generator() -> (StageGenerator, Arc<ScriptedService>) {
    let service = Arc::new(ScriptedService::new());
    (StageGenerator::new(service.clone()), service)
}

fn course_init() -> CourseInit {
    CourseInit {
        id: Uuid::new_v4(),
        title: "Intro to Algorithms".to_string(),
        prerequisites: vec!["Discrete math".to_string()],
        description: "Foundations of algorithm design".to_string(),
        learning_objectives: vec!["Analyze complexity".to_string()],
        target_audience: "Undergraduates".to_string(),
        duration: "12 weeks".to_string(),
        credits: 4,
    }
}

fn outline_for(init: &CourseInit) -> CourseOutline {
    CourseOutline {
        course_id: init.id,
        title: init.title.clone(),
        prerequisites: init.prerequisites.clone(),
        description: init.description.clone(),
        learning_outcomes: vec!["Analyze complexity".to_string()],
        duration: init.duration.clone(),
        credits: init.credits,
    }
}

fn module(title: &str) -> Module {
    Module {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: format!("{title} in depth"),
        hours: "6".to_string(),
    }
}

fn context() -> ContentContext {
    let init = course_init();
    ContentContext {
        outline: outline_for(&init),
        module: module("Graphs"),
        submodule: Submodule {
            id: Uuid::new_v4(),
            title: "Breadth-first search".to_string(),
            description: "Level-order traversal".to_string(),
        },
        activity: Activity {
            id: Uuid::new_v4(),
            name: "BFS reading".to_string(),
            description: "Read about BFS".to_string(),
            objective: "Trace BFS by hand".to_string(),
            activity_type: ActivityType::ReadingMaterial,
        },
    }
}

fn module_json(id: Option<Uuid>, title: &str) -> serde_json::Value {
    let mut value = json!({
        "title": title,
        "description": format!("{title} in depth"),
        "hours": "6"
    });
    if let Some(id) = id {
        value["id"] = json!(id.to_string());
    }
    value
}

fn modules_of(artifact: StageArtifact) -> ModuleSet {
    match artifact {
        StageArtifact::Module(set) => set,
        other => panic!("expected modules, got {other:?}"),
    }
}

mod outline {
    use super::*;

    #[tokio::test]
    async fn echoes_instructor_duration_and_credits() {
        let (generator, service) = generator();
        let init = course_init();
        service.push_json(json!({
            "title": "Intro to Algorithms",
            "prerequisites": ["Discrete math"],
            "description": "A course on algorithm design",
            "learning_outcomes": ["Analyze running time", "Design greedy algorithms"],
            "duration": "3 days",
            "credits": 99
        }));

        let artifact = generator
            .generate(&StageInput::Outline(init.clone()))
            .await
            .expect("outline should generate");

        match artifact {
            StageArtifact::Outline(outline) => {
                assert_eq!(outline.course_id, init.id);
                assert_eq!(outline.duration, "12 weeks");
                assert_eq!(outline.credits, 4);
                assert_eq!(outline.learning_outcomes.len(), 2);
            }
            other => panic!("expected outline, got {other:?}"),
        }

        let requests = service.requests();
        let request = &requests[0];
        assert!(request.expects_json());
        assert!(request.instruction.contains("Intro to Algorithms"));
    }

    #[tokio::test]
    async fn rejects_extra_fields() {
        let (generator, service) = generator();
        service.push_json(json!({
            "title": "T",
            "prerequisites": [],
            "description": "D",
            "learning_outcomes": ["L"],
            "duration": "1 week",
            "credits": 1,
            "surprise": true
        }));

        let err = generator
            .generate(&StageInput::Outline(course_init()))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::SchemaValidationFailed { .. }));
    }
}

mod modules {
    use super::*;

    #[tokio::test]
    async fn assigns_fresh_unique_ids_ignoring_model_ids() {
        let (generator, service) = generator();
        let init = course_init();
        let bogus = Uuid::new_v4();
        service.push_json(json!({
            "modules": [
                module_json(Some(bogus), "Sorting"),
                module_json(Some(bogus), "Graphs"),
                module_json(None, "Dynamic programming")
            ]
        }));

        let set = modules_of(
            generator
                .generate(&StageInput::Module {
                    outline: outline_for(&init),
                    count: Some(3),
                })
                .await
                .unwrap(),
        );

        assert_eq!(set.course_id, init.id);
        let ids: HashSet<Uuid> = set.modules.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&bogus));
    }

    #[tokio::test]
    async fn no_op_redo_preserves_ids() {
        let (generator, service) = generator();
        let init = course_init();
        let previous = ModuleSet {
            course_id: init.id,
            modules: vec![module("Sorting"), module("Graphs"), module("Trees")],
        };
        service.push_json(json!({
            "modules": previous
                .modules
                .iter()
                .map(|m| module_json(Some(m.id), &m.title))
                .collect::<Vec<_>>()
        }));

        let set = modules_of(
            generator
                .redo(
                    &StageInput::Module {
                        outline: outline_for(&init),
                        count: None,
                    },
                    &StageArtifact::Module(previous.clone()),
                    "",
                )
                .await
                .unwrap(),
        );

        let before: Vec<Uuid> = previous.modules.iter().map(|m| m.id).collect();
        let after: Vec<Uuid> = set.modules.iter().map(|m| m.id).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn split_keeps_claimed_ids_and_mints_new_ones() {
        let (generator, service) = generator();
        let init = course_init();
        let previous = ModuleSet {
            course_id: init.id,
            modules: vec![module("Sorting"), module("Graphs"), module("Trees")],
        };
        let second = previous.modules[1].id;
        service.push_json(json!({
            "modules": [
                module_json(Some(previous.modules[0].id), "Sorting"),
                module_json(Some(second), "Graph traversal"),
                module_json(Some(second), "Shortest paths"),
                module_json(None, "Minimum spanning trees"),
                module_json(Some(previous.modules[2].id), "Trees")
            ]
        }));

        let set = modules_of(
            generator
                .redo(
                    &StageInput::Module {
                        outline: outline_for(&init),
                        count: None,
                    },
                    &StageArtifact::Module(previous.clone()),
                    "Split the second module into two",
                )
                .await
                .unwrap(),
        );

        assert!(set.modules.len() >= 4);
        let ids: HashSet<Uuid> = set.modules.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), set.modules.len());
        assert_eq!(set.modules[0].id, previous.modules[0].id);
        assert_eq!(set.modules[1].id, second);
        assert_eq!(set.modules[4].id, previous.modules[2].id);

        let old: HashSet<Uuid> = previous.modules.iter().map(|m| m.id).collect();
        assert!(!old.contains(&set.modules[2].id));
        assert!(!old.contains(&set.modules[3].id));

        let requests = service.requests();
        assert!(!requests[0].instruction.contains("Create 3 modules"));
        assert!(requests[0].instruction.contains("Split the second module into two"));
    }

    #[tokio::test]
    async fn redo_prompt_carries_previous_artifact_and_feedback() {
        let (generator, service) = generator();
        let init = course_init();
        let previous = ModuleSet {
            course_id: init.id,
            modules: vec![module("Sorting")],
        };
        service.push_json(json!({ "modules": [module_json(Some(previous.modules[0].id), "Sorting")] }));

        generator
            .redo(
                &StageInput::Module {
                    outline: outline_for(&init),
                    count: None,
                },
                &StageArtifact::Module(previous.clone()),
                "Make it shorter",
            )
            .await
            .unwrap();

        let requests = service.requests();
        let instruction = &requests[0].instruction;
        assert!(instruction.contains("Make it shorter"));
        assert!(instruction.contains(&previous.modules[0].id.to_string()));
    }

    #[tokio::test]
    async fn redo_with_foreign_stage_fails_before_any_call() {
        let (generator, service) = generator();
        let init = course_init();
        let previous = StageArtifact::MindMap(MindMap {
            module_id: Uuid::new_v4(),
            content: "- root".to_string(),
        });

        let err = generator
            .redo(
                &StageInput::Module {
                    outline: outline_for(&init),
                    count: None,
                },
                &previous,
                "anything",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MissingContext(_)));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_json_keeps_raw_text() {
        let (generator, service) = generator();
        service.push("```json\n{\"modules\": [\n```");

        let err = generator
            .generate(&StageInput::Module {
                outline: outline_for(&course_init()),
                count: Some(3),
            })
            .await
            .unwrap_err();

        match err {
            GenerationError::MalformedResponse { raw, .. } => assert!(raw.contains("modules")),
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_errors_surface_as_generation_failed() {
        let (generator, service) = generator();
        service.push_err(LlmError::Timeout);

        let err = generator
            .generate(&StageInput::Module {
                outline: outline_for(&course_init()),
                count: Some(3),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerationError::GenerationFailed(LlmError::Timeout)
        ));
    }
}

mod content {
    use super::*;

    #[tokio::test]
    async fn reading_summarizes_sources_then_writes_and_summarizes() {
        let (generator, service) = generator();
        let context = context();
        service
            .push("- BFS explores level by level")
            .push("```markdown\n# Breadth-first search\nBFS uses a queue.\n```")
            .push("- BFS uses a queue");

        let artifact = generator
            .generate(&StageInput::Reading {
                context: context.clone(),
                request: ReadingRequest {
                    user_prompt: "Focus on queues".to_string(),
                    previous_summary: None,
                    sources: vec![SourceMaterial {
                        label: "lecture notes".to_string(),
                        text: "<p>BFS   explores</p> level by level".to_string(),
                    }],
                },
            })
            .await
            .unwrap();

        match artifact {
            StageArtifact::Reading(reading) => {
                assert_eq!(reading.activity_id, context.activity.id);
                assert_eq!(reading.content, "# Breadth-first search\nBFS uses a queue.");
                assert_eq!(reading.summary, "- BFS uses a queue");
                assert_eq!(reading.source_summaries.len(), 1);
                assert_eq!(reading.source_summaries[0].label, "lecture notes");
            }
            other => panic!("expected reading, got {other:?}"),
        }

        assert_eq!(service.calls(), 3);
        let requests = service.requests();
        let main_prompt = &requests[1].instruction;
        assert!(main_prompt.contains("Summary from lecture notes"));
        assert!(main_prompt.contains("Focus on queues"));
    }

    #[tokio::test]
    async fn reading_redo_carries_source_summaries_forward() {
        let (generator, service) = generator();
        let context = context();
        let previous = ReadingMaterial {
            activity_id: context.activity.id,
            content: "old".to_string(),
            summary: "old summary".to_string(),
            source_summaries: vec![SourceSummary {
                label: "notes".to_string(),
                summary: "queues".to_string(),
            }],
        };
        service.push("new content").push("new summary");

        let artifact = generator
            .redo(
                &StageInput::Reading {
                    context,
                    request: ReadingRequest {
                        user_prompt: "Add an example".to_string(),
                        previous_summary: None,
                        sources: vec![],
                    },
                },
                &StageArtifact::Reading(previous.clone()),
                "Add an example",
            )
            .await
            .unwrap();

        match artifact {
            StageArtifact::Reading(reading) => {
                assert_eq!(reading.content, "new content");
                assert_eq!(reading.source_summaries, previous.source_summaries);
            }
            other => panic!("expected reading, got {other:?}"),
        }
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn empty_fenced_text_is_malformed() {
        let (generator, service) = generator();
        service.push("```\n```");

        let err = generator
            .generate(&StageInput::Assignment {
                context: context(),
                request: AssignmentRequest {
                    user_prompt: "Build a router".to_string(),
                },
                submodules: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn lecture_keeps_requested_duration() {
        let (generator, service) = generator();
        service.push("Welcome to the lecture").push("- intro");

        let artifact = generator
            .generate(&StageInput::Lecture {
                context: context(),
                request: LectureRequest {
                    user_prompt: "Be lively".to_string(),
                    duration_minutes: Some(15),
                    ..LectureRequest::default()
                },
            })
            .await
            .unwrap();

        match artifact {
            StageArtifact::Lecture(lecture) => {
                assert_eq!(lecture.duration_minutes, Some(15));
                assert_eq!(lecture.summary, "- intro");
            }
            other => panic!("expected lecture, got {other:?}"),
        }
        assert!(service.requests()[0].instruction.contains("15 minutes"));
    }
}

mod quiz {
    use super::*;

    fn request(quiz_type: QuizType, material: Option<&str>) -> QuizRequest {
        QuizRequest {
            user_prompt: "Keep it simple".to_string(),
            spec: QuizSpec {
                number_of_questions: 2,
                quiz_type,
                total_score: 5,
            },
            material_summary: material.map(String::from),
        }
    }

    #[tokio::test]
    async fn distributes_points_and_builds_summary() {
        let (generator, service) = generator();
        service.push_json(json!({
            "questions": [
                {
                    "question": "Which structure does BFS use?",
                    "options": ["Queue", "Stack", "Heap", "Tree"],
                    "answer": "Queue",
                    "explanation": "FIFO order"
                },
                {
                    "question": "Is BFS complete?",
                    "options": ["Yes", "No", "Sometimes", "Never"],
                    "answer": "Yes",
                    "explanation": "On finite graphs"
                }
            ]
        }));

        let artifact = generator
            .generate(&StageInput::Quiz {
                context: context(),
                request: request(QuizType::MultipleChoice, Some("BFS uses a queue")),
            })
            .await
            .unwrap();

        match artifact {
            StageArtifact::Quiz(quiz) => {
                let points: Vec<u32> = quiz.questions.iter().map(|q| q.points).collect();
                assert_eq!(points, vec![3, 2]);
                assert_eq!(quiz.total_score, 5);
                assert_eq!(quiz.material_summary, "BFS uses a queue");
                assert!(quiz.summary.contains("Which structure does BFS use?"));
            }
            other => panic!("expected quiz, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_material_fails_without_calling_the_model() {
        let (generator, service) = generator();

        let err = generator
            .generate(&StageInput::Quiz {
                context: context(),
                request: request(QuizType::TrueFalse, Some("   ")),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MissingContext(_)));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn true_false_answers_are_enforced() {
        let (generator, service) = generator();
        service.push_json(json!({
            "questions": [{
                "question": "BFS uses a stack.",
                "answer": "Nope",
                "explanation": "It uses a queue"
            }]
        }));

        let err = generator
            .generate(&StageInput::Quiz {
                context: context(),
                request: request(QuizType::TrueFalse, Some("BFS uses a queue")),
            })
            .await
            .unwrap_err();

        match err {
            GenerationError::SchemaValidationFailed { errors } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].starts_with("/questions/0/answer"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mcq_answer_outside_the_options_is_rejected() {
        let (generator, service) = generator();
        service.push_json(json!({
            "questions": [{
                "question": "What does BFS use?",
                "options": ["Queue", "Stack", "Heap", "Tree"],
                "answer": "A",
                "explanation": "Level order needs FIFO"
            }]
        }));

        let err = generator
            .generate(&StageInput::Quiz {
                context: context(),
                request: request(QuizType::MultipleChoice, Some("BFS uses a queue")),
            })
            .await
            .unwrap_err();

        match err {
            GenerationError::SchemaValidationFailed { errors } => {
                assert_eq!(errors, vec![
                    "/questions/0/answer: not one of the options, got \"A\"".to_string()
                ]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}

mod mind_map {
    use super::*;

    #[tokio::test]
    async fn requires_submodules() {
        let (generator, service) = generator();

        let err = generator
            .generate(&StageInput::MindMap {
                module: module("Graphs"),
                submodules: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MissingContext(_)));
        assert_eq!(service.calls(), 0);
    }
}
