//! EPUB 2 package assembly.
//!
//! Sections and images are collected in memory in the order they are added
//! and serialised in one go by [`EpubPackage::write`]. The output is
//! deterministic: the book identifier is derived from the source URL and all
//! zip entries carry the same fixed timestamp.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use gutenpub_logging::book_info;
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::markup::escape_text;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("section title is empty")]
    EmptyTitle,
    #[error("failed to read asset {path:?}: {source}")]
    AssetRead { path: PathBuf, source: io::Error },
    #[error("asset path {0:?} has no usable file name")]
    AssetName(PathBuf),
    #[error("output path {0:?} has no usable file name")]
    OutputPath(PathBuf),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: String,
    pub author: Option<String>,
    pub language: String,
    pub identifier: String,
}

impl PackageMetadata {
    /// Metadata whose identifier is stable for a given source URL.
    pub fn for_source(title: impl Into<String>, source_url: &str) -> Self {
        Self {
            title: title.into(),
            author: None,
            language: "en".to_string(),
            identifier: identifier_for(source_url),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// `urn:uuid:` identifier built from the SHA-256 of `source`, with the
/// version nibble set to 4 and the RFC 4122 variant bits.
pub fn identifier_for(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let mut uuid = String::with_capacity(36);
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            uuid.push('-');
        }
        let _ = write!(uuid, "{byte:02x}");
    }
    format!("urn:uuid:{uuid}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedSection {
    pub id: String,
    /// Relative to `OEBPS/`.
    pub href: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedImage {
    pub id: String,
    /// Relative to `OEBPS/`.
    pub href: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EpubPackage {
    metadata: PackageMetadata,
    sections: Vec<PackagedSection>,
    images: Vec<PackagedImage>,
    image_names: HashSet<String>,
}

impl EpubPackage {
    pub fn new(metadata: PackageMetadata) -> Self {
        Self {
            metadata,
            sections: Vec::new(),
            images: Vec::new(),
            image_names: HashSet::new(),
        }
    }

    pub fn sections(&self) -> &[PackagedSection] {
        &self.sections
    }

    pub fn images(&self) -> &[PackagedImage] {
        &self.images
    }

    /// Append a section after all previous ones. Returns its document href.
    pub fn add_section(&mut self, title: &str, body: &str) -> Result<String, PackageError> {
        if title.trim().is_empty() {
            return Err(PackageError::EmptyTitle);
        }
        let id = format!("section{:04}", self.sections.len() + 1);
        let href = format!("text/{id}.xhtml");
        self.sections.push(PackagedSection {
            id,
            href: href.clone(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(href)
    }

    /// Copy a local image into the package.
    ///
    /// Returns the reference to use from section documents. Images sharing a
    /// file name get a numeric suffix.
    pub fn add_image(&mut self, path: &Path) -> Result<String, PackageError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PackageError::AssetName(path.to_path_buf()))?;
        let data = fs::read(path).map_err(|source| PackageError::AssetRead {
            path: path.to_path_buf(),
            source,
        })?;

        let name = self.unique_image_name(name);
        let media_type = guess_media_type(&name, &data);
        let href = format!("images/{name}");
        self.image_names.insert(name);
        self.images.push(PackagedImage {
            id: format!("image{:04}", self.images.len() + 1),
            href: href.clone(),
            media_type,
            data,
        });
        Ok(format!("../{href}"))
    }

    fn unique_image_name(&self, name: &str) -> String {
        if !self.image_names.contains(name) {
            return name.to_string();
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };
        (2..)
            .map(|n| match ext {
                Some(ext) => format!("{stem}-{n}.{ext}"),
                None => format!("{stem}-{n}"),
            })
            .find(|candidate| !self.image_names.contains(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    /// Serialise the package to `path`, creating its directory if needed.
    pub fn write(&self, path: &Path) -> Result<PathBuf, PackageError> {
        let (writer, filename) = AtomicFileWriter::for_target(path)
            .ok_or_else(|| PackageError::OutputPath(path.to_path_buf()))?;
        let bytes = self.to_bytes()?;
        let written = writer.write(&filename, &bytes)?;
        book_info!(
            "Wrote package {:?}: {} sections, {} images, {} bytes",
            written,
            self.sections.len(),
            self.images.len(),
            bytes.len()
        );
        Ok(written)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PackageError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(zip::DateTime::default());
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        // The mimetype entry must come first and stay uncompressed.
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML.as_bytes())?;

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(self.generate_opf().as_bytes())?;

        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(self.generate_ncx().as_bytes())?;

        for section in &self.sections {
            zip.start_file(format!("OEBPS/{}", section.href), deflated)?;
            zip.write_all(section_document(section).as_bytes())?;
        }

        for image in &self.images {
            zip.start_file(format!("OEBPS/{}", image.href), deflated)?;
            zip.write_all(&image.data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn generate_opf(&self) -> String {
        let meta = &self.metadata;
        let mut opf = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
        );
        let _ = writeln!(opf, "    <dc:title>{}</dc:title>", escape_text(&meta.title));
        let _ = writeln!(
            opf,
            "    <dc:identifier id=\"BookId\">{}</dc:identifier>",
            escape_text(&meta.identifier)
        );
        let _ = writeln!(opf, "    <dc:language>{}</dc:language>", escape_text(&meta.language));
        if let Some(author) = &meta.author {
            let _ = writeln!(opf, "    <dc:creator>{}</dc:creator>", escape_text(author));
        }
        opf.push_str("  </metadata>\n  <manifest>\n");
        opf.push_str(
            "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
        );
        for section in &self.sections {
            let _ = writeln!(
                opf,
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>",
                section.id,
                escape_text(&section.href)
            );
        }
        for image in &self.images {
            let _ = writeln!(
                opf,
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>",
                image.id,
                escape_text(&image.href),
                escape_text(&image.media_type)
            );
        }
        opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
        for section in &self.sections {
            let _ = writeln!(opf, "    <itemref idref=\"{}\"/>", section.id);
        }
        opf.push_str("  </spine>\n</package>\n");
        opf
    }

    fn generate_ncx(&self) -> String {
        let mut ncx = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
        );
        let _ = writeln!(
            ncx,
            "    <meta name=\"dtb:uid\" content=\"{}\"/>",
            escape_text(&self.metadata.identifier)
        );
        ncx.push_str(
            r#"    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
"#,
        );
        let _ = writeln!(
            ncx,
            "  <docTitle>\n    <text>{}</text>\n  </docTitle>\n  <navMap>",
            escape_text(&self.metadata.title)
        );
        for (index, section) in self.sections.iter().enumerate() {
            let order = index + 1;
            let _ = writeln!(
                ncx,
                "    <navPoint id=\"navpoint-{order}\" playOrder=\"{order}\">\n      <navLabel>\n        <text>{}</text>\n      </navLabel>\n      <content src=\"{}\"/>\n    </navPoint>",
                escape_text(&section.title),
                escape_text(&section.href)
            );
        }
        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn section_document(section: &PackagedSection) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>{}</title>
</head>
<body>
{}
</body>
</html>
"#,
        escape_text(&section.title),
        section.body
    )
}

/// Media type from the extension, falling back to magic bytes for cache
/// names such as `image_host.tmp`.
fn guess_media_type(name: &str, data: &[u8]) -> String {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let by_ext = match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        _ => None,
    };
    let media_type = by_ext.unwrap_or_else(|| {
        if data.starts_with(b"\x89PNG") {
            "image/png"
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            "image/jpeg"
        } else if data.starts_with(b"GIF8") {
            "image/gif"
        } else {
            "application/octet-stream"
        }
    });
    media_type.to_string()
}
