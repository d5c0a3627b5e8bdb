//! Kurs Core Library
//!
//! Core functionality for turning video transcripts into structured,
//! AI-generated courses: transcript chunking, prompt construction, rate
//! limited model calls with retry, output sanitization, and normalization.

pub mod cache;
pub mod chunker;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod format;
pub mod limiter;
pub mod normalize;
pub mod notes;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod retry;
pub mod sanitize;
pub mod types;
pub mod youtube;

// Re-export commonly used items at crate root
pub use cache::{get_cache_dir, get_course_path, get_root_cache_dir, get_transcript_path};
pub use chunker::{ChunkerConfig, TranscriptChunk, TranscriptContext, build_transcript_context};
pub use client::{AbortHandle, CompletionRequest, GenerationBackend, ModelClient};
pub use config::{AiConfig, RateLimitConfig};
pub use discovery::recommend_videos;
pub use error::{ErrorKind, KursError, Result};
pub use format::{format_course_readable, format_timestamp, timestamp_to_seconds};
pub use limiter::RateLimiter;
pub use normalize::{NormalizedCourse, RawCourseSource, normalize};
pub use notes::{NotesStore, default_notes_path};
pub use pipeline::{
    CourseGenerator, GenerateRequest, load_course, load_transcript, save_course, save_transcript,
};
pub use provider::{ModelTier, Provider};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use sanitize::{fallback_course, sanitize_course, sanitize_timestamp};
pub use types::{
    CourseOutline, Difficulty, Lesson, Module, Quiz, Resource, TranscriptSegment, VideoMetadata,
    VideoRecommendation,
};
