//! End-to-end pipeline behavior against a scripted backend: generation,
//! timestamp repair, and fallback synthesis without touching the network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::BoxStream;
use kurs_core::client::{CompletionRequest, GenerationBackend};
use kurs_core::{
    AiConfig, CourseGenerator, GenerateRequest, KursError, ModelClient, RateLimitConfig,
    RateLimiter, Result, TranscriptSegment, VideoMetadata,
};

struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String>>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }

    fn next(&self) -> Result<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(KursError::GenerationFailed {
                    reason: "script exhausted".into(),
                })
            })
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        self.next()
    }

    async fn complete_stream(
        &self,
        _request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let text = self.next()?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(text)])))
    }
}

fn generator(backend: Arc<ScriptedBackend>, streaming: bool) -> CourseGenerator {
    let config = AiConfig {
        streaming_enabled: streaming,
        ..AiConfig::default()
    };
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        max_retries: 1,
        initial_backoff_ms: 1,
        max_backoff_ms: 10,
        ..RateLimitConfig::default()
    }));
    CourseGenerator::new(ModelClient::with_backend(backend, config, limiter))
}

fn metadata() -> VideoMetadata {
    VideoMetadata {
        video_id: "abc123def45".into(),
        title: "Intro to Graphs".into(),
        description: "Graph theory from scratch.".into(),
        channel_name: "AlgoChannel".into(),
        duration: "25:00".into(),
        ..VideoMetadata::default()
    }
}

fn segments() -> Vec<TranscriptSegment> {
    (0..50)
        .map(|i| TranscriptSegment {
            text: format!("Spoken line number {i} about graphs."),
            start_seconds: i as f64 * 30.0,
            duration_seconds: 30.0,
        })
        .collect()
}

fn outline_json() -> String {
    serde_json::json!({
        "title": "Graphs from Zero",
        "description": "A structured path through graph theory.",
        "detailedOverview": "Everything from vertices to traversals.",
        "category": "Programming",
        "difficulty": "Beginner",
        "learningObjectives": ["model problems as graphs"],
        "prerequisites": [],
        "targetAudience": "programmers new to graphs",
        "estimatedDuration": "25:00",
        "tags": ["Graph Theory", "Algorithms"],
        "resources": [],
        "modules": [{
            "title": "Foundations",
            "description": "The basics.",
            "lessons": [{
                "title": "What is a graph?",
                "description": "Vertices and edges.",
                "durationMinutes": 12.0,
                "timestampStart": "0:00",
                "timestampEnd": "12:00.000000 repeated garbage",
                "keyPoints": ["V and E"]
            }]
        }]
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn full_generation_sanitizes_and_normalizes() {
    let backend = ScriptedBackend::new(vec![
        Ok("Analysis: the video teaches graph basics.".into()),
        Ok(outline_json()),
    ]);
    let generator = generator(backend, false);
    let meta = metadata();
    let segments = segments();

    let course = generator
        .generate_course(&GenerateRequest {
            metadata: &meta,
            segments: &segments,
            fallback_transcript: None,
        })
        .await
        .unwrap();

    assert_eq!(course.title, "Graphs from Zero");
    // "Programming" is generic, so the first real tag wins.
    assert_eq!(course.category, "Graph Theory");
    assert_eq!(course.video_id.as_deref(), Some("abc123def45"));
    assert!(!course.degraded);

    // The malformed end timestamp was repaired to its valid prefix.
    let lesson = &course.sections[0].lessons[0];
    assert_eq!(lesson.end_seconds, Some(720.0));
}

#[tokio::test(start_paused = true)]
async fn streaming_generation_reports_deltas() {
    let backend = ScriptedBackend::new(vec![
        Ok("Analysis text.".into()),
        Ok(outline_json()),
    ]);
    let generator = generator(backend, true);
    let meta = metadata();
    let segments = segments();

    let mut deltas = 0usize;
    let course = generator
        .generate_course_streaming(
            &GenerateRequest {
                metadata: &meta,
                segments: &segments,
                fallback_transcript: None,
            },
            &kurs_core::AbortHandle::new(),
            &mut |_| deltas += 1,
        )
        .await
        .unwrap();

    assert!(deltas > 0);
    assert_eq!(course.title, "Graphs from Zero");
}

#[tokio::test(start_paused = true)]
async fn total_failure_synthesizes_fallback_course() {
    // Analysis fails on every attempt, transiently, until retries exhaust.
    let failures: Vec<Result<String>> = (0..4)
        .map(|_| {
            Err(KursError::UpstreamStatus {
                status: 503,
                body: "unavailable".into(),
            })
        })
        .collect();
    let generator = generator(ScriptedBackend::new(failures), false);
    let meta = metadata();
    let segments = segments();

    let course = generator
        .generate_course(&GenerateRequest {
            metadata: &meta,
            segments: &segments,
            fallback_transcript: None,
        })
        .await
        .unwrap();

    assert!(course.degraded);
    assert_eq!(course.title, "Intro to Graphs");
    assert_eq!(course.sections.len(), 1);
    assert_eq!(course.sections[0].lessons.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failure_without_metadata_propagates_the_error() {
    let generator = generator(
        ScriptedBackend::new(vec![Err(KursError::InvalidResponse {
            reason: "not an object".into(),
        })]),
        false,
    );
    let meta = VideoMetadata {
        video_id: "abc123def45".into(),
        ..VideoMetadata::default()
    };
    let segments = segments();

    let result = generator
        .generate_course(&GenerateRequest {
            metadata: &meta,
            segments: &segments,
            fallback_transcript: None,
        })
        .await;

    assert!(matches!(result, Err(KursError::InvalidResponse { .. })));
}

#[tokio::test(start_paused = true)]
async fn no_transcript_with_metadata_degrades_gracefully() {
    // No model calls happen at all; the script would fail if one did.
    let generator = generator(ScriptedBackend::new(vec![]), false);
    let meta = metadata();

    let course = generator
        .generate_course(&GenerateRequest {
            metadata: &meta,
            segments: &[],
            fallback_transcript: None,
        })
        .await
        .unwrap();

    assert!(course.degraded);
    assert_eq!(course.sections[0].lessons[0].title, "Intro to Graphs");
}

#[tokio::test(start_paused = true)]
async fn no_transcript_and_no_metadata_is_a_hard_error() {
    let generator = generator(ScriptedBackend::new(vec![]), false);
    let meta = VideoMetadata {
        video_id: "abc123def45".into(),
        ..VideoMetadata::default()
    };

    let result = generator
        .generate_course(&GenerateRequest {
            metadata: &meta,
            segments: &[],
            fallback_transcript: None,
        })
        .await;

    assert!(matches!(result, Err(KursError::NoTranscript { .. })));
}

#[tokio::test(start_paused = true)]
async fn fallback_blob_feeds_generation() {
    let backend = ScriptedBackend::new(vec![
        Ok("Analysis text.".into()),
        Ok(outline_json()),
    ]);
    let generator = generator(backend, false);
    let meta = metadata();

    let course = generator
        .generate_course(&GenerateRequest {
            metadata: &meta,
            segments: &[],
            fallback_transcript: Some("First idea. Second idea. Third idea."),
        })
        .await
        .unwrap();

    assert!(!course.degraded);
    assert_eq!(course.title, "Graphs from Zero");
}
