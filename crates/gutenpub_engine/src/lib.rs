//! Gutenpub engine: turns one long HTML book into a sectioned EPUB.
mod assets;
mod config;
mod decode;
mod fetch;
mod filename;
mod markup;
mod node;
mod package;
mod persist;
mod pipeline;
mod segment;
mod title;
mod types;

pub use assets::{
    AssetFetcher, AssetResolver, CachedAssetFetcher, PackageResolver, ResolveError, ResolvedAsset,
};
pub use config::{BookConfig, DEFAULT_SOURCE_URL};
pub use decode::{decode_html, DecodedHtml};
pub use fetch::{fetch_or_load_document, DocumentOrigin, FetchSettings, HttpClient, SourceDocument};
pub use filename::asset_filename;
pub use markup::escape_text;
pub use node::{find_body, parse_document, DocNode, NodeKind};
pub use package::{
    identifier_for, EpubPackage, PackageError, PackageMetadata, PackagedImage, PackagedSection,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{convert, convert_with, ConversionSummary, ConvertError};
pub use segment::{SegmentOptions, Segmentation, SegmentationState, Segmenter};
pub use title::extract_title;
pub use types::{AssetReference, FailureKind, FetchError, FetchMetadata, FetchOutput, Section};
