mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Context;
use gutenpub_logging::book_info;

fn main() -> anyhow::Result<()> {
    logging::initialize();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = config::load_config(&cwd);
    book_info!(
        "Converting {} into {:?}",
        config.source_url,
        config.output_path
    );

    let summary = gutenpub_engine::convert(&config)
        .with_context(|| format!("converting {}", config.source_url))?;

    if !summary.skipped_sections.is_empty() {
        book_info!(
            "{} sections were left out: {:?}",
            summary.skipped_sections.len(),
            summary.skipped_sections
        );
    }
    println!(
        "Successfully created EPUB: {} ({} sections, {} images)",
        summary.output_path.display(),
        summary.section_count,
        summary.asset_count
    );
    Ok(())
}
