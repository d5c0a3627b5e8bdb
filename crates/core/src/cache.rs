use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

use crate::provider::ModelTier;

/// Get the cache directory for a given video id
pub fn get_cache_dir(video_id: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    video_id.hash(&mut hasher);
    let id_hash = hasher.finish();

    get_root_cache_dir().join(id_hash.to_string())
}

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("kurs")
}

/// Get the path for a cached transcript file
pub fn get_transcript_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("transcript.json")
}

/// Get the path for a cached course file (tier aware)
pub fn get_course_path(cache_dir: &Path, tier: ModelTier) -> PathBuf {
    cache_dir.join(format!("course_{}.json", tier.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dirs_are_stable_per_video() {
        assert_eq!(get_cache_dir("abc123def45"), get_cache_dir("abc123def45"));
        assert_ne!(get_cache_dir("abc123def45"), get_cache_dir("zzz999zzz99"));
    }

    #[test]
    fn course_paths_are_tier_specific() {
        let dir = PathBuf::from("/tmp/x");
        assert_ne!(
            get_course_path(&dir, ModelTier::Fast),
            get_course_path(&dir, ModelTier::Smart)
        );
    }
}
