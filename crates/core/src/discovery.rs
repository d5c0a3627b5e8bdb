//! Video discovery: turn a learning topic into a search query, search the
//! platform, and rank the hits with a structured model call.

use serde::Deserialize;

use crate::client::ModelClient;
use crate::error::Result;
use crate::prompts;
use crate::provider::ModelTier;
use crate::types::{VideoMetadata, VideoRecommendation};
use crate::youtube::YoutubeClient;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankingResponse {
    rankings: Vec<RankingEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankingEntry {
    video_id: String,
    relevance_score: f32,
    justification: String,
}

/// Strip quoting and keep only the first line of a generated search query.
fn clean_query(raw: &str) -> String {
    raw.lines()
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(['"', '\'', '`'])
        .trim()
        .to_string()
}

fn neutral_recommendation(meta: &VideoMetadata, topic: &str) -> VideoRecommendation {
    VideoRecommendation {
        video_id: meta.video_id.clone(),
        title: meta.title.clone(),
        channel_name: meta.channel_name.clone(),
        thumbnail: meta.thumbnail.clone(),
        duration: meta.duration.clone(),
        view_count: meta.view_count,
        published_at: meta.published_at.clone(),
        relevance_score: 0.5,
        justification: format!("Matched a search for \"{topic}\""),
    }
}

fn apply_rankings(
    candidates: &[VideoMetadata],
    entries: &[RankingEntry],
    topic: &str,
) -> Vec<VideoRecommendation> {
    let mut recommendations: Vec<VideoRecommendation> = candidates
        .iter()
        .map(|meta| {
            let mut rec = neutral_recommendation(meta, topic);
            if let Some(entry) = entries.iter().find(|e| e.video_id == meta.video_id) {
                rec.relevance_score = entry.relevance_score.clamp(0.0, 1.0);
                rec.justification = entry.justification.clone();
            }
            rec
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    recommendations
}

/// Recommend videos for a learning topic. Ranking failures degrade to
/// search order with a neutral score rather than failing the request.
pub async fn recommend_videos(
    model: &ModelClient,
    youtube: &YoutubeClient,
    topic: &str,
    max_results: u32,
) -> Result<Vec<VideoRecommendation>> {
    let query = match model
        .generate_text(
            ModelTier::Fast,
            &prompts::video_search_query(topic),
            Some(0.3),
        )
        .await
    {
        Ok(raw) => {
            let cleaned = clean_query(&raw);
            if cleaned.is_empty() {
                topic.to_string()
            } else {
                cleaned
            }
        }
        Err(err) => {
            tracing::warn!(
                target: "discovery",
                kind = ?err.kind(),
                error = %err,
                "query generation failed, searching with the raw topic"
            );
            topic.to_string()
        }
    };

    tracing::info!(target: "discovery", %query, "searching for candidate videos");
    let candidates = youtube.search(&query, max_results).await?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let entries = match model
        .generate_object::<RankingResponse>(
            ModelTier::Default,
            &prompts::video_ranking(topic, &candidates),
            Some(0.3),
        )
        .await
    {
        Ok(response) => response.rankings,
        Err(err) => {
            tracing::warn!(
                target: "discovery",
                kind = ?err.kind(),
                error = %err,
                "ranking failed, falling back to search order"
            );
            Vec::new()
        }
    };

    Ok(apply_rankings(&candidates, &entries, topic))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, title: &str) -> VideoMetadata {
        VideoMetadata {
            video_id: id.to_string(),
            title: title.to_string(),
            ..VideoMetadata::default()
        }
    }

    #[test]
    fn query_cleanup_strips_quotes_and_extra_lines() {
        assert_eq!(clean_query("\"rust tutorial\"\nmore text"), "rust tutorial");
        assert_eq!(clean_query("`rust lifetimes explained`"), "rust lifetimes explained");
        assert_eq!(clean_query("  plain query  "), "plain query");
    }

    #[test]
    fn rankings_sort_candidates_by_score() {
        let candidates = vec![candidate("a", "A"), candidate("b", "B"), candidate("c", "C")];
        let entries = vec![
            RankingEntry {
                video_id: "a".into(),
                relevance_score: 0.2,
                justification: "weak".into(),
            },
            RankingEntry {
                video_id: "c".into(),
                relevance_score: 0.9,
                justification: "strong".into(),
            },
        ];

        let ranked = apply_rankings(&candidates, &entries, "topic");
        assert_eq!(ranked[0].video_id, "c");
        assert_eq!(ranked[0].justification, "strong");
        // Unranked candidate keeps the neutral score and sorts between.
        assert_eq!(ranked[1].video_id, "b");
        assert_eq!(ranked[1].relevance_score, 0.5);
        assert_eq!(ranked[2].video_id, "a");
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let candidates = vec![candidate("a", "A")];
        let entries = vec![RankingEntry {
            video_id: "a".into(),
            relevance_score: 7.5,
            justification: "overexcited".into(),
        }];

        let ranked = apply_rankings(&candidates, &entries, "topic");
        assert_eq!(ranked[0].relevance_score, 1.0);
    }
}
