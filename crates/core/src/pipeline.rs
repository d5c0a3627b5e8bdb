use std::path::Path;

use tokio::fs;

use crate::chunker::{ChunkerConfig, TranscriptContext, build_transcript_context};
use crate::client::{AbortHandle, ModelClient};
use crate::error::{KursError, Result};
use crate::normalize::{NormalizedCourse, PersistedCourse, RawCourseSource, normalize};
use crate::prompts;
use crate::provider::ModelTier;
use crate::sanitize::{fallback_course, outline_is_usable, sanitize_course};
use crate::types::{CourseOutline, Quiz, TranscriptSegment, VideoMetadata};

/// Everything needed to generate a course for one video. Transcript
/// segments may be empty; a fallback blob or bare metadata still produces
/// a (degraded) course.
pub struct GenerateRequest<'a> {
    pub metadata: &'a VideoMetadata,
    pub segments: &'a [TranscriptSegment],
    pub fallback_transcript: Option<&'a str>,
}

/// Course generation pipeline: chunk → analyze → structure → sanitize →
/// fallback → normalize.
pub struct CourseGenerator {
    client: ModelClient,
    chunker: ChunkerConfig,
}

impl CourseGenerator {
    pub fn new(client: ModelClient) -> Self {
        Self {
            client,
            chunker: ChunkerConfig::default(),
        }
    }

    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn client(&self) -> &ModelClient {
        &self.client
    }

    fn transcript_context(&self, request: &GenerateRequest<'_>) -> TranscriptContext {
        build_transcript_context(request.segments, request.fallback_transcript, &self.chunker)
    }

    /// Generate a course outline, falling back to metadata-only synthesis
    /// when the model fails. With neither transcript nor metadata the
    /// failure propagates.
    pub async fn generate_course(
        &self,
        request: &GenerateRequest<'_>,
    ) -> Result<NormalizedCourse> {
        let outline = self
            .generate_outline(request, &AbortHandle::new(), &mut |_| {})
            .await?;
        Ok(self.finish(request, outline))
    }

    /// Streaming variant: `on_delta` observes raw generation chunks and the
    /// abort handle stops processing between chunks.
    pub async fn generate_course_streaming(
        &self,
        request: &GenerateRequest<'_>,
        abort: &AbortHandle,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<NormalizedCourse> {
        let outline = self.generate_outline(request, abort, on_delta).await?;
        Ok(self.finish(request, outline))
    }

    async fn generate_outline(
        &self,
        request: &GenerateRequest<'_>,
        abort: &AbortHandle,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<CourseOutline> {
        let meta = request.metadata;
        let context = self.transcript_context(request);
        if context.chunks.is_empty() {
            tracing::warn!(
                target: "pipeline",
                video_id = %meta.video_id,
                "no transcript available, synthesizing fallback course"
            );
            return fallback_course(meta).map_err(|_| KursError::NoTranscript {
                video_id: meta.video_id.clone(),
            });
        }

        tracing::info!(
            target: "pipeline",
            video_id = %meta.video_id,
            chunks = context.chunks.len(),
            duration_seconds = context.total_duration_seconds,
            "generating course"
        );

        let generated = self.generate_from_context(meta, &context, abort, on_delta).await;
        match generated {
            Ok(mut outline) if outline_is_usable(&outline) => {
                let repairs = sanitize_course(&mut outline);
                if repairs > 0 {
                    tracing::info!(
                        target: "pipeline",
                        video_id = %meta.video_id,
                        repairs,
                        "sanitized generated timestamps"
                    );
                }
                Ok(outline)
            }
            Ok(_) => {
                tracing::warn!(
                    target: "pipeline",
                    video_id = %meta.video_id,
                    "generated outline is missing required fields, using fallback"
                );
                fallback_course(meta)
            }
            Err(err) if matches!(err, KursError::Cancelled) => Err(err),
            Err(err) => {
                tracing::error!(
                    target: "pipeline",
                    video_id = %meta.video_id,
                    kind = ?err.kind(),
                    error = %err,
                    "course generation failed"
                );
                // Keep the original error when no metadata can back a fallback.
                fallback_course(meta).map_err(|_| err)
            }
        }
    }

    async fn generate_from_context(
        &self,
        meta: &VideoMetadata,
        context: &TranscriptContext,
        abort: &AbortHandle,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<CourseOutline> {
        // Analysis runs cold (low temperature) so the structure pass works
        // from a stable topic map instead of raw transcript alone.
        let analysis = self
            .client
            .generate_text(
                ModelTier::Smart,
                &prompts::content_analysis(meta, &context.full_text),
                Some(0.3),
            )
            .await?;

        let structure_prompt = prompts::course_structure(&analysis, &context.full_text);
        if self.client.config().streaming_enabled {
            self.client
                .stream_object(ModelTier::Smart, &structure_prompt, None, abort, |delta| {
                    on_delta(delta)
                })
                .await
        } else {
            self.client
                .generate_object(ModelTier::Smart, &structure_prompt, None)
                .await
        }
    }

    fn finish(&self, request: &GenerateRequest<'_>, outline: CourseOutline) -> NormalizedCourse {
        let source = RawCourseSource::ModuleBased(PersistedCourse {
            id: None,
            video_id: Some(request.metadata.video_id.clone()),
            thumbnail: None,
            outline,
        });
        normalize(&source, Some(request.metadata))
    }

    /// Generate a quiz for one lesson.
    pub async fn generate_quiz(
        &self,
        lesson_title: &str,
        lesson_content: &str,
        num_questions: usize,
        difficulty: &str,
    ) -> Result<Quiz> {
        self.client
            .generate_object(
                ModelTier::Default,
                &prompts::quiz_generation(lesson_title, lesson_content, num_questions, difficulty),
                Some(0.8),
            )
            .await
    }

    /// Generate supplementary reading for one lesson.
    pub async fn generate_supplementary(
        &self,
        course_title: &str,
        lesson_title: &str,
        lesson_text: &str,
    ) -> Result<String> {
        self.client
            .generate_text(
                ModelTier::Default,
                &prompts::supplementary_content(course_title, lesson_title, lesson_text),
                None,
            )
            .await
    }

    /// Answer a learner question in course context.
    pub async fn tutor_response(
        &self,
        question: &str,
        course_title: &str,
        lesson_context: &str,
        chat_history: &[(String, String)],
    ) -> Result<String> {
        self.client
            .generate_text(
                ModelTier::Default,
                &prompts::tutor_contextual_response(
                    question,
                    course_title,
                    lesson_context,
                    chat_history,
                ),
                Some(0.8),
            )
            .await
    }

    /// Explain one concept in course context.
    pub async fn explain_concept(&self, concept: &str, course_context: &str) -> Result<String> {
        self.client
            .generate_text(
                ModelTier::Default,
                &prompts::tutor_concept_explanation(concept, course_context),
                None,
            )
            .await
    }
}

/// Load transcript segments from a cached JSON file
pub async fn load_transcript(path: &Path) -> Result<Vec<TranscriptSegment>> {
    let json_content = fs::read_to_string(path).await?;
    let segments: Vec<TranscriptSegment> = serde_json::from_str(&json_content)?;
    Ok(segments)
}

/// Save transcript segments to a file
pub async fn save_transcript(segments: &[TranscriptSegment], path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(segments)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

/// Load a course from a cached file
pub async fn load_course(path: &Path) -> Result<NormalizedCourse> {
    let json_content = fs::read_to_string(path).await?;
    let course: NormalizedCourse = serde_json::from_str(&json_content)?;
    Ok(course)
}

/// Save a course to a file
pub async fn save_course(course: &NormalizedCourse, path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(course)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}
