//! One conversion run: document -> tree -> sections and assets -> package.
//!
//! Structural failures abort with a [`ConvertError`]; a failing image or
//! section is logged and left out.

use std::path::PathBuf;

use gutenpub_logging::{book_info, book_warn};

use crate::assets::{AssetFetcher, CachedAssetFetcher, PackageResolver};
use crate::config::BookConfig;
use crate::decode::decode_html;
use crate::fetch::{fetch_or_load_document, HttpClient};
use crate::node::parse_document;
use crate::package::{EpubPackage, PackageError, PackageMetadata};
use crate::persist::{ensure_output_dir, PersistError};
use crate::segment::{Segmentation, Segmenter};
use crate::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to prepare image cache directory: {0}")]
    ImageCache(#[source] PersistError),
    #[error("failed to fetch or load source document: {0}")]
    Document(#[source] FetchError),
    #[error("failed to write package: {0}")]
    Package(#[from] PackageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub output_path: PathBuf,
    pub section_count: usize,
    pub asset_count: usize,
    /// Titles of sections the package refused.
    pub skipped_sections: Vec<String>,
}

/// Run a full conversion with the HTTP-backed fetchers.
pub fn convert(config: &BookConfig) -> Result<ConversionSummary, ConvertError> {
    ensure_output_dir(&config.image_cache_dir).map_err(ConvertError::ImageCache)?;
    let client = HttpClient::new(config.fetch.clone()).map_err(ConvertError::Document)?;
    let assets = CachedAssetFetcher::new(client.clone(), config.image_cache_dir.clone());
    convert_with(config, &client, &assets)
}

/// Run a conversion with a caller-provided asset fetcher.
pub fn convert_with(
    config: &BookConfig,
    client: &HttpClient,
    assets: &dyn AssetFetcher,
) -> Result<ConversionSummary, ConvertError> {
    let source = fetch_or_load_document(&config.source_url, &config.document_cache, client)
        .map_err(ConvertError::Document)?;
    let decoded = decode_html(&source.bytes, source.content_type.as_deref());
    book_info!(
        "Decoded source document as {} ({:?})",
        decoded.encoding_label,
        source.origin
    );
    let document = parse_document(&decoded.html);

    let mut metadata = PackageMetadata::for_source(config.title.clone(), &config.source_url)
        .with_language(config.language.clone());
    if let Some(author) = &config.author {
        metadata = metadata.with_author(author.clone());
    }
    let mut package = EpubPackage::new(metadata);

    let segmenter = Segmenter::new(source.base_url, config.segment.clone());
    let Segmentation {
        sections,
        assets: resolved,
    } = {
        let mut resolver = PackageResolver::new(assets, &mut package);
        segmenter.segment_document(document.tree.root(), &mut resolver)
    };
    book_info!(
        "Segmented {} sections with {} images",
        sections.len(),
        resolved.len()
    );

    let mut skipped_sections = Vec::new();
    for section in &sections {
        if let Err(err) = package.add_section(&section.title, &section.body) {
            book_warn!("Could not add section '{}': {}", section.title, err);
            skipped_sections.push(section.title.clone());
        }
    }

    let output_path = package.write(&config.output_path)?;
    Ok(ConversionSummary {
        output_path,
        section_count: package.sections().len(),
        asset_count: package.images().len(),
        skipped_sections,
    })
}
