//! Prompt construction for every model-facing task. Pure string building,
//! no state and no network.

use crate::types::VideoMetadata;

static GROUNDING_RULE: &str = "Base every statement strictly on the supplied material. \
Never invent facts, names, URLs, or timestamps that are not present in the transcript \
or description. If something is unclear, omit it rather than guessing.";

static COURSE_STRUCTURE_SHAPE: &str = r#"{
  "title": string,
  "description": string,
  "detailedOverview": string,
  "category": string,
  "difficulty": "Beginner" | "Intermediate" | "Advanced",
  "learningObjectives": string[],
  "prerequisites": string[],
  "targetAudience": string,
  "estimatedDuration": string,
  "tags": string[],
  "resources": [
    {
      "title": string,
      "url": string,
      "type": "Video" | "Article" | "Documentation" | "Tool" | "Website" | "Other",
      "description": string,
      "category": "Social" | "Creator Links" | "Other Resources"
    }
  ],
  "modules": [
    {
      "title": string,
      "description": string,
      "lessons": [
        {
          "title": string,
          "description": string,
          "durationMinutes": number,
          "timestampStart": "H:MM:SS or MM:SS",
          "timestampEnd": "H:MM:SS or MM:SS",
          "keyPoints": string[]
        }
      ]
    }
  ],
  "assessmentPlan": {
    "quizPlacements": [{ "moduleIndex": number, "rationale": string }],
    "includeFinalTest": boolean,
    "includeFinalProject": boolean
  }
}"#;

/// First pass: free-text analysis of the video content, fed into the
/// structure-generation prompt afterwards.
pub fn content_analysis(meta: &VideoMetadata, transcript: &str) -> String {
    format!(
        r#"You are an expert course creator analyzing a video to plan a structured course.

Video Title: {title}
Channel: {channel}
Description: {description}

Transcript (with timestamps):
{transcript}

Produce a concise analysis covering:
1. The main topics and concepts, in the order they appear
2. Timestamps where the topic changes
3. The natural difficulty level and target audience
4. Concrete skills a learner would gain
5. Any practical examples or demonstrations shown

{grounding}"#,
        title = meta.title,
        channel = meta.channel_name,
        description = meta.description,
        transcript = transcript,
        grounding = GROUNDING_RULE,
    )
}

/// Second pass: generate the full course outline as JSON.
pub fn course_structure(analysis: &str, transcript: &str) -> String {
    format!(
        r#"You are an expert educational course designer. Using the analysis and transcript
below, create a complete, structured learning course.

CONTENT ANALYSIS:
{analysis}

TRANSCRIPT:
{transcript}

Guidelines:
1. Structure modules around natural topic boundaries in the video
2. Keep each lesson focused on a single complete concept
3. Every lesson MUST carry timestampStart and timestampEnd taken from the
   transcript, formatted exactly as H:MM:SS or MM:SS - nothing appended
4. Estimate realistic lesson durations in minutes
5. Order lessons from basic to advanced where the content allows
6. Only list resources that are actually mentioned in the video or description

{grounding}

Output ONLY a valid JSON object matching this structure (no markdown, no commentary):
{shape}"#,
        analysis = analysis,
        transcript = transcript,
        grounding = GROUNDING_RULE,
        shape = COURSE_STRUCTURE_SHAPE,
    )
}

/// Quiz generation for a single lesson.
pub fn quiz_generation(
    lesson_title: &str,
    lesson_content: &str,
    num_questions: usize,
    difficulty: &str,
) -> String {
    format!(
        r#"You are an educational assessment writer. Create a quiz for the lesson below.

Lesson: {title}
Difficulty: {difficulty}

Lesson content:
{content}

Rules:
- Exactly {count} multiple-choice questions
- Four options each, exactly one correct
- Questions must be answerable from the lesson content alone
- Include a short explanation for each correct answer

{grounding}

Output ONLY valid JSON:
{{
  "title": string,
  "questions": [
    {{
      "question": string,
      "options": [string, string, string, string],
      "correctIndex": number,
      "explanation": string
    }}
  ]
}}"#,
        title = lesson_title,
        difficulty = difficulty,
        content = lesson_content,
        count = num_questions,
        grounding = GROUNDING_RULE,
    )
}

/// Free-text supplementary material for one course segment.
pub fn supplementary_content(course_title: &str, lesson_title: &str, lesson_text: &str) -> String {
    format!(
        r#"You are an educational content specialist working on the course "{course}".
Write supplementary learning material for the lesson "{lesson}".

Source material:
{text}

Cover, where the material supports it:
- Key concepts and terminology with short definitions
- Common misconceptions
- Practical applications
- Tips for remembering the material

{grounding}"#,
        course = course_title,
        lesson = lesson_title,
        text = lesson_text,
        grounding = GROUNDING_RULE,
    )
}

/// Tutoring: answer a learner's question in the context of the course.
pub fn tutor_contextual_response(
    question: &str,
    course_title: &str,
    lesson_context: &str,
    chat_history: &[(String, String)],
) -> String {
    let mut history = String::new();
    for (role, text) in chat_history {
        history.push_str(&format!("{role}: {text}\n"));
    }

    format!(
        r#"You are a patient tutor helping a learner through the course "{course}".

Current lesson context:
{context}

Conversation so far:
{history}
Learner's question: {question}

Answer clearly and encouragingly, at the level of the course material.
{grounding}"#,
        course = course_title,
        context = lesson_context,
        history = history,
        question = question,
        grounding = GROUNDING_RULE,
    )
}

/// Tutoring: explain one concept in course context.
pub fn tutor_concept_explanation(concept: &str, course_context: &str) -> String {
    format!(
        r#"You are a tutor. Explain the concept "{concept}" to a learner taking this course:

{context}

Use a plain-language explanation followed by one concrete example drawn from
the course material. {grounding}"#,
        concept = concept,
        context = course_context,
        grounding = GROUNDING_RULE,
    )
}

/// Rank search candidates against a learning topic.
pub fn video_ranking(topic: &str, candidates: &[VideoMetadata]) -> String {
    let mut listing = String::new();
    for candidate in candidates {
        listing.push_str(&format!(
            "- id: {id} | title: {title} | channel: {channel} | duration: {duration} | views: {views}\n",
            id = candidate.video_id,
            title = candidate.title,
            channel = candidate.channel_name,
            duration = candidate.duration,
            views = candidate
                .view_count
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        ));
    }

    format!(
        r#"You are helping a learner pick a video to study this topic:
{topic}

Candidate videos:
{listing}
Score each candidate for how well it teaches the topic (0.0 to 1.0) and
justify the score in one sentence. Judge only from the listed metadata.
{grounding}

Output ONLY valid JSON:
{{
  "rankings": [
    {{ "videoId": string, "relevanceScore": number, "justification": string }}
  ]
}}"#,
        topic = topic,
        listing = listing,
        grounding = GROUNDING_RULE,
    )
}

/// Turn a learning topic into a single video search query.
pub fn video_search_query(topic: &str) -> String {
    format!(
        r#"Generate one effective video search query for somebody who wants to learn:
{topic}

Rules:
- Return ONLY the query text, no quotes, no explanation
- Prefer tutorial/course phrasing over news or entertainment phrasing
- Keep it under 10 words"#,
    )
}
