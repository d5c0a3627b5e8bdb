//! Repair of untrusted model output. The structured call already enforces
//! the overall shape; timestamps still arrive malformed often enough
//! (run-on digits, duplicated fragments) to need in-place repair.

use crate::error::{KursError, Result};
use crate::types::{CourseOutline, Difficulty, Lesson, Module, VideoMetadata};

pub const DEFAULT_TIMESTAMP: &str = "0:00:00";

const MAX_TIMESTAMP_LEN: usize = 8;

/// Longest prefix of `s` shaped like `H:MM:SS`, `MM:SS`, or `M:SS`.
fn leading_timestamp(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();

    let lead = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if lead == 0 || lead > 2 {
        return None;
    }

    let mut end = lead;
    for _ in 0..2 {
        let rest = &bytes[end..];
        if rest.len() >= 3
            && rest[0] == b':'
            && rest[1].is_ascii_digit()
            && rest[2].is_ascii_digit()
            && !rest.get(3).is_some_and(|b| b.is_ascii_digit())
        {
            end += 3;
        } else {
            break;
        }
    }

    if end > lead { Some(&s[..end]) } else { None }
}

pub fn is_valid_timestamp(s: &str) -> bool {
    s.len() <= MAX_TIMESTAMP_LEN && leading_timestamp(s) == Some(s)
}

/// Coerce a timestamp to a valid `H:MM:SS`/`MM:SS` value: keep valid input
/// unchanged, truncate to a leading valid prefix when possible, and fall
/// back to [`DEFAULT_TIMESTAMP`]. Idempotent.
pub fn sanitize_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_valid_timestamp(trimmed) {
        return trimmed.to_string();
    }
    match leading_timestamp(trimmed) {
        Some(prefix) => prefix.to_string(),
        None => DEFAULT_TIMESTAMP.to_string(),
    }
}

fn repair_field(field: &mut String, lesson: &str, which: &str, repairs: &mut usize) {
    let sanitized = sanitize_timestamp(field);
    if sanitized != *field {
        tracing::warn!(
            target: "sanitize",
            lesson,
            which,
            original = %field,
            repaired = %sanitized,
            "repaired malformed timestamp"
        );
        *field = sanitized;
        *repairs += 1;
    }
}

/// Repair every lesson timestamp in place. Returns the repair count;
/// repairs are logged, never escalated.
pub fn sanitize_course(outline: &mut CourseOutline) -> usize {
    let mut repairs = 0;
    for module in &mut outline.modules {
        for lesson in &mut module.lessons {
            let title = lesson.title.clone();
            repair_field(&mut lesson.timestamp_start, &title, "start", &mut repairs);
            repair_field(&mut lesson.timestamp_end, &title, "end", &mut repairs);
        }
    }
    repairs
}

/// Whether a generated outline is usable at all. Anything failing this is
/// replaced by fallback synthesis when metadata allows.
pub fn outline_is_usable(outline: &CourseOutline) -> bool {
    !outline.title.trim().is_empty() && !outline.modules.is_empty()
}

/// Build a minimal single-module, single-lesson outline from video metadata
/// alone. Used when generation fails entirely; with no usable metadata the
/// caller propagates the original error instead.
pub fn fallback_course(meta: &VideoMetadata) -> Result<CourseOutline> {
    if meta.title.trim().is_empty() {
        return Err(KursError::GenerationFailed {
            reason: "no metadata available for fallback course".to_string(),
        });
    }

    tracing::info!(
        target: "sanitize",
        video_id = %meta.video_id,
        "synthesizing fallback course from video metadata"
    );

    let description = if meta.description.trim().is_empty() {
        format!("A course generated from the video \"{}\".", meta.title)
    } else {
        meta.description.clone()
    };

    let end = if is_valid_timestamp(meta.duration.trim()) {
        meta.duration.trim().to_string()
    } else {
        DEFAULT_TIMESTAMP.to_string()
    };
    let duration_minutes = crate::format::timestamp_to_seconds(&end)
        .map(|s| (s / 60.0).round())
        .unwrap_or(0.0);

    Ok(CourseOutline {
        title: meta.title.clone(),
        description: description.clone(),
        detailed_overview: description,
        category: "General".to_string(),
        difficulty: Difficulty::Intermediate,
        learning_objectives: vec![format!("Understand the material covered in {}", meta.title)],
        prerequisites: Vec::new(),
        target_audience: "Anyone interested in the video's topic".to_string(),
        estimated_duration: end.clone(),
        tags: Vec::new(),
        resources: Vec::new(),
        modules: vec![Module {
            title: "Full Video".to_string(),
            description: "Watch the complete video from start to finish.".to_string(),
            lessons: vec![Lesson {
                title: meta.title.clone(),
                description: "Complete video lesson.".to_string(),
                duration_minutes,
                timestamp_start: DEFAULT_TIMESTAMP.to_string(),
                timestamp_end: end,
                key_points: Vec::new(),
                content: None,
            }],
        }],
        assessment_plan: None,
        degraded: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_timestamps_pass_through() {
        for ts in ["0:00", "1:05", "12:34", "1:23:45", "0:00:00", "12:34:56"] {
            assert_eq!(sanitize_timestamp(ts), ts);
        }
    }

    #[test]
    fn run_on_timestamp_truncates_to_leading_prefix() {
        assert_eq!(
            sanitize_timestamp("1:23:45 extra garbage repeating 0000000000"),
            "1:23:45"
        );
        assert_eq!(sanitize_timestamp("12:34.567"), "12:34");
        assert_eq!(sanitize_timestamp("5:10:15:20"), "5:10:15");
    }

    #[test]
    fn garbage_becomes_the_default() {
        for ts in ["banana", "", ":", "123:45", "later", "::20"] {
            assert_eq!(sanitize_timestamp(ts), DEFAULT_TIMESTAMP, "input {ts:?}");
        }
    }

    #[test]
    fn sanitization_is_idempotent() {
        for ts in [
            "banana",
            "1:23:45 extra garbage",
            "0:00",
            "12:34:56",
            "9:99:99",
            "1:2:3",
            "",
        ] {
            let once = sanitize_timestamp(ts);
            assert_eq!(sanitize_timestamp(&once), once, "input {ts:?}");
        }
    }

    #[test]
    fn too_long_without_prefix_is_default() {
        // Over eight characters and no valid leading timestamp.
        assert_eq!(sanitize_timestamp("111:22:33:44"), DEFAULT_TIMESTAMP);
    }

    #[test]
    fn sanitize_course_repairs_all_lessons() {
        let mut outline = CourseOutline {
            title: "Test".into(),
            modules: vec![Module {
                title: "M1".into(),
                description: String::new(),
                lessons: vec![
                    Lesson {
                        title: "ok".into(),
                        description: String::new(),
                        duration_minutes: 5.0,
                        timestamp_start: "0:00".into(),
                        timestamp_end: "5:00".into(),
                        key_points: vec![],
                        content: None,
                    },
                    Lesson {
                        title: "broken".into(),
                        description: String::new(),
                        duration_minutes: 5.0,
                        timestamp_start: "5:00.123456".into(),
                        timestamp_end: "nonsense".into(),
                        key_points: vec![],
                        content: None,
                    },
                ],
            }],
            description: String::new(),
            detailed_overview: String::new(),
            category: String::new(),
            difficulty: Difficulty::Beginner,
            learning_objectives: vec![],
            prerequisites: vec![],
            target_audience: String::new(),
            estimated_duration: String::new(),
            tags: vec![],
            resources: vec![],
            assessment_plan: None,
            degraded: false,
        };

        let repairs = sanitize_course(&mut outline);
        assert_eq!(repairs, 2);
        assert_eq!(outline.modules[0].lessons[1].timestamp_start, "5:00");
        assert_eq!(outline.modules[0].lessons[1].timestamp_end, DEFAULT_TIMESTAMP);
        assert_eq!(outline.modules[0].lessons[0].timestamp_start, "0:00");
    }

    #[test]
    fn fallback_course_from_title_and_id_only() {
        let meta = VideoMetadata {
            video_id: "abc123def45".into(),
            title: "Intro to Sorting".into(),
            ..VideoMetadata::default()
        };

        let outline = fallback_course(&meta).unwrap();
        assert!(!outline.title.is_empty());
        assert_eq!(outline.modules.len(), 1);
        assert_eq!(outline.modules[0].lessons.len(), 1);
        assert!(outline.degraded);
        assert_eq!(outline.modules[0].lessons[0].timestamp_start, DEFAULT_TIMESTAMP);
    }

    #[test]
    fn fallback_without_metadata_is_an_error() {
        let meta = VideoMetadata::default();
        assert!(fallback_course(&meta).is_err());
    }

    #[test]
    fn fallback_uses_video_duration_when_present() {
        let meta = VideoMetadata {
            video_id: "abc123def45".into(),
            title: "Long Talk".into(),
            duration: "1:30:00".into(),
            ..VideoMetadata::default()
        };

        let outline = fallback_course(&meta).unwrap();
        assert_eq!(outline.modules[0].lessons[0].timestamp_end, "1:30:00");
        assert_eq!(outline.modules[0].lessons[0].duration_minutes, 90.0);
    }
}
