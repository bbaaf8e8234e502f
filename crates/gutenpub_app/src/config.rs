use std::fs;
use std::io;
use std::path::Path;

use gutenpub_engine::BookConfig;
use gutenpub_logging::{book_info, book_warn};

pub(crate) const CONFIG_FILENAME: &str = "gutenpub.ron";

/// Load `gutenpub.ron` from `dir`.
///
/// A missing file means defaults. An unreadable or unparsable file is logged
/// and also falls back to defaults.
pub(crate) fn load_config(dir: &Path) -> BookConfig {
    let path = dir.join(CONFIG_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return BookConfig::default();
        }
        Err(err) => {
            book_warn!("Failed to read config from {:?}: {}", path, err);
            return BookConfig::default();
        }
    };

    match ron::from_str::<BookConfig>(&content) {
        Ok(config) => {
            book_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            book_warn!("Failed to parse config from {:?}: {}", path, err);
            BookConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_config(temp.path()), BookConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILENAME),
            r#"(
                title: "Les Misérables",
                output_path: "out/miserables.epub",
                segment: (boundary_tags: ["h2", "h3"]),
            )"#,
        )
        .unwrap();

        let config = load_config(temp.path());
        assert_eq!(config.title, "Les Misérables");
        assert_eq!(config.output_path, PathBuf::from("out/miserables.epub"));
        assert_eq!(config.segment.boundary_tags, vec!["h2", "h3"]);
        assert_eq!(config.segment.initial_title, "Chapter 1");
        assert_eq!(config.source_url, gutenpub_engine::DEFAULT_SOURCE_URL);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "(title: ").unwrap();
        assert_eq!(load_config(temp.path()), BookConfig::default());
    }
}
