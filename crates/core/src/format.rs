use crate::normalize::NormalizedCourse;

/// Format seconds as an `H:MM:SS` or `M:SS` timestamp.
pub fn format_timestamp(total_seconds: f64) -> String {
    if !total_seconds.is_finite() || total_seconds < 0.0 {
        return "0:00".to_string();
    }

    let total = total_seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Parse an `H:MM:SS`, `MM:SS`, or bare-seconds string back into seconds.
pub fn timestamp_to_seconds(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let mut numbers = Vec::with_capacity(parts.len());
    for part in &parts {
        numbers.push(part.parse::<f64>().ok()?);
    }

    match numbers.as_slice() {
        [hours, minutes, seconds] => Some(hours * 3600.0 + minutes * 60.0 + seconds),
        [minutes, seconds] => Some(minutes * 60.0 + seconds),
        [seconds] => Some(*seconds),
        _ => None,
    }
}

/// Format a normalized course as human-readable markdown
pub fn format_course_readable(course: &NormalizedCourse) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", course.title));

    output.push_str(&format!(
        "**Category:** {} | **Difficulty:** {} | **Duration:** {}\n\n",
        course.category, course.difficulty, course.estimated_duration
    ));

    if !course.description.is_empty() {
        output.push_str("## Overview\n\n");
        output.push_str(&course.description);
        output.push_str("\n\n");
    }

    if !course.tags.is_empty() {
        output.push_str("## Tags\n\n");
        for tag in &course.tags {
            output.push_str(&format!("• {}\n", tag));
        }
        output.push('\n');
    }

    output.push_str("## Curriculum\n\n");
    for (i, section) in course.sections.iter().enumerate() {
        output.push_str(&format!("### {}. {}\n\n", i + 1, section.title));
        if !section.description.is_empty() {
            output.push_str(&format!("{}\n\n", section.description));
        }

        for lesson in &section.lessons {
            let range = match (lesson.start_seconds, lesson.end_seconds) {
                (Some(start), Some(end)) => {
                    format!(" [{}–{}]", format_timestamp(start), format_timestamp(end))
                }
                (Some(start), None) => format!(" [{}]", format_timestamp(start)),
                _ => String::new(),
            };
            output.push_str(&format!("- {}{}\n", lesson.title, range));
            for point in &lesson.key_points {
                output.push_str(&format!("  • {}\n", point));
            }
        }
        output.push('\n');
    }

    if !course.resources.is_empty() {
        output.push_str("## Resources\n\n");
        for resource in &course.resources {
            if resource.url.is_empty() {
                output.push_str(&format!("• {}\n", resource.title));
            } else {
                output.push_str(&format!("• {} — {}\n", resource.title, resource.url));
            }
        }
        output.push('\n');
    }

    output
}
