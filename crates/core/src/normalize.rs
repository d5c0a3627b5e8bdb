//! Reconciliation of course data arriving from different sources into one
//! canonical shape. Pure and idempotent; no I/O.

use serde::{Deserialize, Serialize};

use crate::format::{format_timestamp, timestamp_to_seconds};
use crate::types::{
    CourseOutline, Difficulty, Resource, ResourceCategory, ResourceType, VideoMetadata,
};

/// Placeholder categories that never win over a real tag.
const GENERIC_CATEGORIES: [&str; 6] = [
    "General",
    "Programming",
    "Uncategorized",
    "Other",
    "Miscellaneous",
    "Programming Fundamentals",
];

/// Module-based persisted shape: a generated outline plus storage fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCourse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(flatten)]
    pub outline: CourseOutline,
}

/// Legacy free-form generated shape, section-based with numeric timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeFormCourse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub total_duration: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub sections: Vec<FreeFormSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeFormSection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lessons: Vec<FreeFormLesson>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeFormLesson {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
}

/// The two raw shapes a course can arrive in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawCourseSource {
    ModuleBased(PersistedCourse),
    FreeForm(FreeFormCourse),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedLesson {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_seconds: Option<f64>,
    #[serde(default)]
    pub end_seconds: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSection {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lessons: Vec<NormalizedLesson>,
}

/// Canonical shape consumed downstream, whatever the source looked like.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCourse {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub estimated_duration: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sections: Vec<NormalizedSection>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub degraded: bool,
}

fn is_generic_category(name: &str) -> bool {
    GENERIC_CATEGORIES
        .iter()
        .any(|g| g.eq_ignore_ascii_case(name.trim()))
}

/// Prefer a specific category; fall back to the first non-generic tag, then
/// to whatever category was given, then to "General".
fn derive_category(category: &str, tags: &[String]) -> String {
    let category = category.trim();
    if !category.is_empty() && !is_generic_category(category) {
        return category.to_string();
    }
    if let Some(tag) = tags
        .iter()
        .map(|t| t.trim())
        .find(|t| !t.is_empty() && !is_generic_category(t))
    {
        return tag.to_string();
    }
    if category.is_empty() {
        "General".to_string()
    } else {
        category.to_string()
    }
}

fn parse_difficulty(raw: &str) -> Difficulty {
    match raw.trim().to_ascii_lowercase().as_str() {
        "beginner" | "easy" | "introductory" => Difficulty::Beginner,
        "advanced" | "expert" | "hard" => Difficulty::Advanced,
        _ => Difficulty::Intermediate,
    }
}

fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn derive_id(explicit: Option<&String>, video_id: Option<&String>, title: &str) -> String {
    if let Some(id) = explicit {
        return id.clone();
    }
    if let Some(vid) = video_id {
        return format!("course-{vid}");
    }
    format!("local-{}", slugify(title))
}

fn placeholder_section() -> NormalizedSection {
    NormalizedSection {
        title: "Course Content".to_string(),
        description: "Content for this course is still being prepared.".to_string(),
        lessons: vec![NormalizedLesson {
            title: "Full video".to_string(),
            description: "Watch the source video in full.".to_string(),
            ..NormalizedLesson::default()
        }],
    }
}

fn placeholder_resource() -> Resource {
    Resource {
        title: "Additional resources coming soon".to_string(),
        url: String::new(),
        resource_type: ResourceType::Other,
        description: None,
        category: ResourceCategory::OtherResources,
    }
}

fn parse_lesson_seconds(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    timestamp_to_seconds(trimmed)
}

/// Merge a raw course with optional video metadata into the canonical
/// shape. Pure; calling it again on its own output changes nothing.
pub fn normalize(source: &RawCourseSource, meta: Option<&VideoMetadata>) -> NormalizedCourse {
    let mut course = match source {
        RawCourseSource::ModuleBased(persisted) => {
            let outline = &persisted.outline;
            NormalizedCourse {
                id: String::new(),
                title: outline.title.clone(),
                description: outline.description.clone(),
                video_id: persisted.video_id.clone(),
                thumbnail: persisted.thumbnail.clone(),
                category: derive_category(&outline.category, &outline.tags),
                difficulty: outline.difficulty.to_string(),
                estimated_duration: outline.estimated_duration.clone(),
                tags: outline.tags.clone(),
                sections: outline
                    .modules
                    .iter()
                    .map(|module| NormalizedSection {
                        title: module.title.clone(),
                        description: module.description.clone(),
                        lessons: module
                            .lessons
                            .iter()
                            .map(|lesson| NormalizedLesson {
                                title: lesson.title.clone(),
                                description: lesson.description.clone(),
                                start_seconds: parse_lesson_seconds(&lesson.timestamp_start),
                                end_seconds: parse_lesson_seconds(&lesson.timestamp_end),
                                duration_minutes: (lesson.duration_minutes > 0.0)
                                    .then_some(lesson.duration_minutes),
                                key_points: lesson.key_points.clone(),
                                content: lesson.content.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
                resources: outline.resources.clone(),
                degraded: outline.degraded,
            }
            .with_id(persisted.id.as_ref())
        }
        RawCourseSource::FreeForm(freeform) => NormalizedCourse {
            id: String::new(),
            title: freeform.title.clone(),
            description: freeform.description.clone(),
            video_id: freeform.video_id.clone(),
            thumbnail: None,
            category: derive_category(
                freeform.category.as_deref().unwrap_or(""),
                &freeform.skills,
            ),
            difficulty: parse_difficulty(freeform.difficulty_level.as_deref().unwrap_or(""))
                .to_string(),
            estimated_duration: freeform.total_duration.clone().unwrap_or_default(),
            tags: freeform.skills.clone(),
            sections: freeform
                .sections
                .iter()
                .map(|section| NormalizedSection {
                    title: section.title.clone(),
                    description: section.description.clone(),
                    lessons: section
                        .lessons
                        .iter()
                        .map(|lesson| NormalizedLesson {
                            title: lesson.title.clone(),
                            description: lesson.description.clone(),
                            start_seconds: lesson.start_time.map(f64::floor),
                            end_seconds: lesson.end_time.map(f64::floor),
                            duration_minutes: lesson
                                .duration
                                .as_deref()
                                .and_then(|d| d.trim().parse::<f64>().ok()),
                            key_points: Vec::new(),
                            content: lesson.content.clone(),
                        })
                        .collect(),
                })
                .collect(),
            resources: Vec::new(),
            degraded: false,
        }
        .with_id(None),
    };

    if let Some(meta) = meta {
        if course.title.trim().is_empty() {
            course.title = meta.title.clone();
        }
        if course.description.trim().is_empty() {
            course.description = meta.description.clone();
        }
        if course.video_id.is_none() && !meta.video_id.is_empty() {
            course.video_id = Some(meta.video_id.clone());
        }
        if course.thumbnail.is_none() {
            course.thumbnail = meta.thumbnail.clone();
        }
        if course.estimated_duration.trim().is_empty() {
            course.estimated_duration = meta.duration.clone();
        }
        // Id may depend on the metadata-supplied video id.
        if course.id.starts_with("local-") {
            course.id = derive_id(None, course.video_id.as_ref(), &course.title);
        }
    }

    if course.sections.is_empty() {
        course.sections = vec![placeholder_section()];
    }
    if course.resources.is_empty() {
        course.resources = vec![placeholder_resource()];
    }

    course
}

impl NormalizedCourse {
    fn with_id(mut self, explicit: Option<&String>) -> Self {
        self.id = derive_id(explicit, self.video_id.as_ref(), &self.title);
        self
    }
}

/// Re-wrap a normalized course as a module-based source, so it can flow
/// through [`normalize`] again unchanged.
impl From<&NormalizedCourse> for RawCourseSource {
    fn from(course: &NormalizedCourse) -> Self {
        RawCourseSource::ModuleBased(PersistedCourse {
            id: Some(course.id.clone()),
            video_id: course.video_id.clone(),
            thumbnail: course.thumbnail.clone(),
            outline: CourseOutline {
                title: course.title.clone(),
                description: course.description.clone(),
                detailed_overview: String::new(),
                category: course.category.clone(),
                difficulty: parse_difficulty(&course.difficulty),
                learning_objectives: Vec::new(),
                prerequisites: Vec::new(),
                target_audience: String::new(),
                estimated_duration: course.estimated_duration.clone(),
                tags: course.tags.clone(),
                resources: course.resources.clone(),
                modules: course
                    .sections
                    .iter()
                    .map(|section| crate::types::Module {
                        title: section.title.clone(),
                        description: section.description.clone(),
                        lessons: section
                            .lessons
                            .iter()
                            .map(|lesson| crate::types::Lesson {
                                title: lesson.title.clone(),
                                description: lesson.description.clone(),
                                duration_minutes: lesson.duration_minutes.unwrap_or(0.0),
                                timestamp_start: lesson
                                    .start_seconds
                                    .map(format_timestamp)
                                    .unwrap_or_default(),
                                timestamp_end: lesson
                                    .end_seconds
                                    .map(format_timestamp)
                                    .unwrap_or_default(),
                                key_points: lesson.key_points.clone(),
                                content: lesson.content.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
                assessment_plan: None,
                degraded: course.degraded,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lesson, Module};

    fn outline() -> CourseOutline {
        CourseOutline {
            title: "Rust Basics".into(),
            description: "Learn Rust".into(),
            detailed_overview: "A longer overview".into(),
            category: "Programming".into(),
            difficulty: Difficulty::Beginner,
            learning_objectives: vec!["own the borrow checker".into()],
            prerequisites: vec![],
            target_audience: "new Rustaceans".into(),
            estimated_duration: "2:00:00".into(),
            tags: vec!["Programming".into(), "Rust".into(), "Systems".into()],
            resources: vec![],
            modules: vec![Module {
                title: "Getting Started".into(),
                description: "first steps".into(),
                lessons: vec![Lesson {
                    title: "Hello".into(),
                    description: "hello world".into(),
                    duration_minutes: 10.0,
                    timestamp_start: "0:00".into(),
                    timestamp_end: "10:00".into(),
                    key_points: vec!["cargo new".into()],
                    content: None,
                }],
            }],
            assessment_plan: None,
            degraded: false,
        }
    }

    fn meta() -> VideoMetadata {
        VideoMetadata {
            video_id: "abc123def45".into(),
            title: "Rust video".into(),
            description: "video description".into(),
            thumbnail: Some("https://example.com/t.jpg".into()),
            duration: "2:00:00".into(),
            ..VideoMetadata::default()
        }
    }

    #[test]
    fn module_based_course_normalizes() {
        let source = RawCourseSource::ModuleBased(PersistedCourse {
            id: None,
            video_id: None,
            thumbnail: None,
            outline: outline(),
        });

        let course = normalize(&source, Some(&meta()));
        assert_eq!(course.title, "Rust Basics");
        assert_eq!(course.id, "course-abc123def45");
        assert_eq!(course.video_id.as_deref(), Some("abc123def45"));
        assert_eq!(course.sections.len(), 1);
        assert_eq!(course.sections[0].lessons[0].start_seconds, Some(0.0));
        assert_eq!(course.sections[0].lessons[0].end_seconds, Some(600.0));
    }

    #[test]
    fn category_prefers_specific_tag_over_generic() {
        let source = RawCourseSource::ModuleBased(PersistedCourse {
            outline: outline(), // category "Programming" is generic
            ..PersistedCourse::default()
        });
        let course = normalize(&source, None);
        assert_eq!(course.category, "Rust");
    }

    #[test]
    fn specific_category_is_kept() {
        let mut o = outline();
        o.category = "Web Development".into();
        let source = RawCourseSource::ModuleBased(PersistedCourse {
            outline: o,
            ..PersistedCourse::default()
        });
        assert_eq!(normalize(&source, None).category, "Web Development");
    }

    #[test]
    fn all_generic_falls_back_to_given_category() {
        let mut o = outline();
        o.category = "Other".into();
        o.tags = vec!["General".into(), "Miscellaneous".into()];
        let source = RawCourseSource::ModuleBased(PersistedCourse {
            outline: o,
            ..PersistedCourse::default()
        });
        assert_eq!(normalize(&source, None).category, "Other");
    }

    #[test]
    fn missing_arrays_default_to_placeholders() {
        let mut o = outline();
        o.modules.clear();
        o.resources.clear();
        let source = RawCourseSource::ModuleBased(PersistedCourse {
            outline: o,
            ..PersistedCourse::default()
        });

        let course = normalize(&source, None);
        assert_eq!(course.sections.len(), 1);
        assert_eq!(course.sections[0].title, "Course Content");
        assert_eq!(course.resources.len(), 1);
    }

    #[test]
    fn free_form_course_normalizes() {
        let source = RawCourseSource::FreeForm(FreeFormCourse {
            title: "Legacy Course".into(),
            description: "old shape".into(),
            category: None,
            difficulty_level: Some("expert".into()),
            total_duration: Some("1:30:00".into()),
            skills: vec!["Kubernetes".into()],
            video_id: Some("vid00000001".into()),
            sections: vec![FreeFormSection {
                title: "Part One".into(),
                description: String::new(),
                lessons: vec![FreeFormLesson {
                    title: "Intro".into(),
                    description: String::new(),
                    content: None,
                    duration: Some("12".into()),
                    start_time: Some(0.0),
                    end_time: Some(720.0),
                }],
            }],
        });

        let course = normalize(&source, None);
        assert_eq!(course.difficulty, "Advanced");
        assert_eq!(course.category, "Kubernetes");
        assert_eq!(course.id, "course-vid00000001");
        assert_eq!(course.sections[0].lessons[0].duration_minutes, Some(12.0));
        assert_eq!(course.sections[0].lessons[0].end_seconds, Some(720.0));
    }

    #[test]
    fn normalize_is_idempotent() {
        let source = RawCourseSource::ModuleBased(PersistedCourse {
            id: None,
            video_id: None,
            thumbnail: None,
            outline: outline(),
        });
        let meta = meta();

        let once = normalize(&source, Some(&meta));
        let twice = normalize(&RawCourseSource::from(&once), Some(&meta));
        assert_eq!(once, twice);

        let free = RawCourseSource::FreeForm(FreeFormCourse {
            title: "Legacy".into(),
            sections: vec![],
            ..FreeFormCourse::default()
        });
        let once = normalize(&free, None);
        let twice = normalize(&RawCourseSource::from(&once), None);
        assert_eq!(once, twice);
    }
}
