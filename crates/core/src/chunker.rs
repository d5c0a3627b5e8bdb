use serde::{Deserialize, Serialize};

use crate::format::format_timestamp;
use crate::types::TranscriptSegment;

const DEFAULT_CHUNK_CHAR_TARGET: usize = 8_000;
const DEFAULT_MIN_SEGMENTS: usize = 40;

/// Synthetic cadence used when resegmenting a flat transcript blob.
const FALLBACK_SEGMENT_SECONDS: f64 = 5.0;

#[derive(Clone, Debug)]
pub struct ChunkerConfig {
    /// Character budget per chunk. A chunk is flushed once its buffer
    /// exceeds this, subject to the minimum segment floor.
    pub chunk_char_target: usize,
    /// Minimum number of buffered lines before a flush is allowed, so many
    /// tiny segments do not produce a spray of small chunks.
    pub min_segments_per_chunk: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_char_target: DEFAULT_CHUNK_CHAR_TARGET,
            min_segments_per_chunk: DEFAULT_MIN_SEGMENTS,
        }
    }
}

/// A contiguous, non-overlapping slice of the transcript, sized for prompt
/// inclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
    pub token_estimate: usize,
}

/// Chunked transcript plus a concatenated full-text view ready to drop into
/// a prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptContext {
    pub chunks: Vec<TranscriptChunk>,
    pub full_text: String,
    pub total_duration_seconds: f64,
    pub total_segments: usize,
}

/// Split a flat transcript blob into synthetic segments on sentence
/// boundaries, with a fixed cadence per sentence.
fn resegment_fallback(text: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|next| next.is_whitespace()) {
            let sentence = current.trim();
            if !sentence.is_empty() {
                segments.push(TranscriptSegment {
                    text: sentence.to_string(),
                    start_seconds: segments.len() as f64 * FALLBACK_SEGMENT_SECONDS,
                    duration_seconds: FALLBACK_SEGMENT_SECONDS,
                });
            }
            current.clear();
        }
    }

    let trailing = current.trim();
    if !trailing.is_empty() {
        segments.push(TranscriptSegment {
            text: trailing.to_string(),
            start_seconds: segments.len() as f64 * FALLBACK_SEGMENT_SECONDS,
            duration_seconds: FALLBACK_SEGMENT_SECONDS,
        });
    }

    segments
}

fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    ((words as f64 * 1.35).round() as usize).max(1)
}

/// Group transcript segments into time-bounded chunks within the configured
/// character budget. When no segments are available, `fallback_transcript`
/// is resegmented on sentence boundaries. Empty input yields an empty
/// context, never an error.
pub fn build_transcript_context(
    segments: &[TranscriptSegment],
    fallback_transcript: Option<&str>,
    config: &ChunkerConfig,
) -> TranscriptContext {
    let resegmented;
    let segments: &[TranscriptSegment] = if segments.is_empty() {
        match fallback_transcript {
            Some(text) if !text.trim().is_empty() => {
                resegmented = resegment_fallback(text);
                &resegmented
            }
            _ => return TranscriptContext::default(),
        }
    } else {
        segments
    };

    let mut chunks: Vec<TranscriptChunk> = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut chars = 0usize;
    let mut chunk_start = segments[0].start_seconds;
    let mut chunk_end = chunk_start;

    let mut flush = |lines: &mut Vec<String>, chars: &mut usize, start: f64, end: f64| {
        if lines.is_empty() {
            return;
        }
        let text = lines.join(" ").trim().to_string();
        chunks.push(TranscriptChunk {
            index: chunks.len(),
            start_seconds: start,
            end_seconds: end,
            token_estimate: estimate_tokens(&text),
            text,
        });
        lines.clear();
        *chars = 0;
    };

    for segment in segments {
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }

        let segment_start = segment.start_seconds;
        let segment_end = segment_start + segment.duration_seconds;
        let formatted = format!("[{}] {}", format_timestamp(segment_start), text);

        let over_budget = chars + formatted.len() > config.chunk_char_target
            && lines.len() >= config.min_segments_per_chunk;
        if over_budget {
            flush(&mut lines, &mut chars, chunk_start, chunk_end);
            chunk_start = segment_start;
        }

        chars += formatted.len();
        lines.push(formatted);
        chunk_end = chunk_end.max(segment_end.max(segment_start));
    }

    // Trailing partial buffer always becomes the final chunk.
    flush(&mut lines, &mut chars, chunk_start, chunk_end);

    let full_text = chunks
        .iter()
        .map(|chunk| {
            format!(
                "### TRANSCRIPT CHUNK {} | {} - {} | ~{} tokens\n{}",
                chunk.index + 1,
                format_timestamp(chunk.start_seconds),
                format_timestamp(chunk.end_seconds),
                chunk.token_estimate,
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    TranscriptContext {
        total_duration_seconds: chunks.last().map(|c| c.end_seconds).unwrap_or(0.0),
        total_segments: segments.len(),
        chunks,
        full_text,
    }
}
