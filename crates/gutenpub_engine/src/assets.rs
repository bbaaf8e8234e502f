use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use gutenpub_logging::{book_debug, book_warn};
use url::Url;

use crate::fetch::HttpClient;
use crate::filename::asset_filename;
use crate::package::{EpubPackage, PackageError};
use crate::persist::AtomicFileWriter;
use crate::{FailureKind, FetchError};

/// Turns an absolute asset URL into a local file.
pub trait AssetFetcher {
    fn fetch(&self, url: &Url) -> Result<PathBuf, FetchError>;
}

/// Fetches assets over HTTP into a flat cache directory, reusing any file
/// already there under the derived name.
///
/// Distinct URLs with the same last path segment share one cache file. The
/// first URL to claim a name in a run is remembered so later claimants are
/// reported.
#[derive(Debug, Clone)]
pub struct CachedAssetFetcher {
    client: HttpClient,
    cache_dir: PathBuf,
    filled_by: RefCell<HashMap<String, Url>>,
}

impl CachedAssetFetcher {
    pub fn new(client: HttpClient, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            cache_dir: cache_dir.into(),
            filled_by: RefCell::new(HashMap::new()),
        }
    }

    /// The URL whose bytes back `filename` in this run, if any.
    pub fn filled_by(&self, filename: &str) -> Option<Url> {
        self.filled_by.borrow().get(filename).cloned()
    }

    fn claim(&self, filename: &str, url: &Url) {
        let mut filled_by = self.filled_by.borrow_mut();
        let owner = filled_by
            .entry(filename.to_string())
            .or_insert_with(|| url.clone());
        if owner != url {
            book_warn!(
                "Cache file {} for {} already holds the image from {}",
                filename,
                url,
                owner
            );
        }
    }
}

impl AssetFetcher for CachedAssetFetcher {
    fn fetch(&self, url: &Url) -> Result<PathBuf, FetchError> {
        let filename = asset_filename(url);
        let path = self.cache_dir.join(&filename);

        match fs::metadata(&path) {
            Ok(_) => {
                book_debug!("Asset cache hit for {} at {:?}", url, path);
                self.claim(&filename, url);
                return Ok(path);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(FetchError::new(
                    FailureKind::Io,
                    format!("failed to check cached asset {path:?}: {err}"),
                ));
            }
        }

        let output = self.client.get(url)?;
        let writer = AtomicFileWriter::new(self.cache_dir.clone());
        let written = writer.write(&filename, &output.bytes).map_err(|err| {
            FetchError::new(FailureKind::Io, format!("failed to save asset {path:?}: {err}"))
        })?;
        self.claim(&filename, url);
        book_debug!("Fetched asset {} ({} bytes)", url, output.metadata.byte_len);
        Ok(written)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub local_path: PathBuf,
    pub packaged_path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("could not fetch: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not embed: {0}")]
    Embed(#[from] PackageError),
}

/// What the segmentation walk needs for each image: a local copy and the
/// reference to use from inside the package.
pub trait AssetResolver {
    fn resolve(&mut self, url: &Url) -> Result<ResolvedAsset, ResolveError>;
}

/// Fetches through an [`AssetFetcher`] and embeds into an [`EpubPackage`].
pub struct PackageResolver<'a> {
    fetcher: &'a dyn AssetFetcher,
    package: &'a mut EpubPackage,
}

impl<'a> PackageResolver<'a> {
    pub fn new(fetcher: &'a dyn AssetFetcher, package: &'a mut EpubPackage) -> Self {
        Self { fetcher, package }
    }
}

impl AssetResolver for PackageResolver<'_> {
    fn resolve(&mut self, url: &Url) -> Result<ResolvedAsset, ResolveError> {
        let local_path = self.fetcher.fetch(url)?;
        let packaged_path = self.package.add_image(&local_path)?;
        Ok(ResolvedAsset {
            local_path,
            packaged_path,
        })
    }
}
