use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::fetch::FetchSettings;
use crate::segment::SegmentOptions;

pub const DEFAULT_SOURCE_URL: &str =
    "https://www.gutenberg.org/cache/epub/1184/pg1184-images.html";

/// Everything a conversion run needs. Every field has a default, so a
/// partial config file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub source_url: String,
    /// Local copy of the source document, reused when present.
    pub document_cache: PathBuf,
    pub image_cache_dir: PathBuf,
    pub output_path: PathBuf,
    pub title: String,
    pub author: Option<String>,
    pub language: String,
    pub segment: SegmentOptions,
    pub fetch: FetchSettings,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            document_cache: PathBuf::from("output.html"),
            image_cache_dir: PathBuf::from("temp_images"),
            output_path: PathBuf::from("output.epub"),
            title: "Count of Monte Cristo".to_string(),
            author: Some("Alexandre Dumas".to_string()),
            language: "en".to_string(),
            segment: SegmentOptions::default(),
            fetch: FetchSettings::default(),
        }
    }
}

impl BookConfig {
    /// Defaults with every path placed under `dir`.
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let defaults = Self::default();
        Self {
            document_cache: dir.join(&defaults.document_cache),
            image_cache_dir: dir.join(&defaults.image_cache_dir),
            output_path: dir.join(&defaults.output_path),
            ..defaults
        }
    }
}
