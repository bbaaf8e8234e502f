//! Section segmentation and inline image resolution.
//!
//! A single pre-order walk over the document body. Boundary headings close
//! the running section and name the next one, text nodes become standalone
//! paragraphs, and `img` elements are fetched, embedded and rewired to their
//! packaged copy. Images inside a heading are kept; its text is not.

use std::collections::HashMap;
use std::mem;

use gutenpub_logging::{book_debug, book_warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::assets::AssetResolver;
use crate::markup::{image_paragraph, text_paragraph};
use crate::node::{find_body, DocNode, NodeKind};
use crate::title::extract_title;
use crate::types::{AssetReference, Section};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Tags that start a new section, compared case-insensitively.
    pub boundary_tags: Vec<String>,
    /// Title of any content that precedes the first boundary.
    pub initial_title: String,
    /// Used when a boundary heading has no text.
    pub fallback_title: String,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            boundary_tags: vec!["h3".to_string()],
            initial_title: "Chapter 1".to_string(),
            fallback_title: "Unnamed Section".to_string(),
        }
    }
}

/// Mutable state of one walk: the open section's body and title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationState {
    body: String,
    current_title: String,
}

impl SegmentationState {
    pub fn new(initial_title: impl Into<String>) -> Self {
        Self {
            body: String::new(),
            current_title: initial_title.into(),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn current_title(&self) -> &str {
        &self.current_title
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn ends_with_paragraph(&self) -> bool {
        self.body.ends_with("</p>")
    }

    /// Append one raw text node. Whitespace-only text leaves the state untouched.
    pub fn push_text(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        self.push_block(&text_paragraph(trimmed));
    }

    pub fn push_image(&mut self, packaged_path: &str) {
        self.push_block(&image_paragraph(packaged_path));
    }

    fn push_block(&mut self, block: &str) {
        if self.ends_with_paragraph() {
            self.body.push('\n');
        }
        self.body.push_str(block);
    }

    /// Close the open section, if it has content, and start an empty one
    /// under `next_title`.
    pub fn begin_section(&mut self, next_title: String) -> Option<Section> {
        let finished = self.finish();
        self.current_title = next_title;
        finished
    }

    /// Take the open section if it has content. The title is kept.
    pub fn finish(&mut self) -> Option<Section> {
        if self.body.is_empty() {
            return None;
        }
        Some(Section {
            title: self.current_title.clone(),
            body: mem::take(&mut self.body),
        })
    }
}

/// Result of one walk: sections in reading order and one asset reference per
/// distinct image URL, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub sections: Vec<Section>,
    pub assets: Vec<AssetReference>,
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    base_url: Url,
    options: SegmentOptions,
}

struct Walk<'r> {
    state: SegmentationState,
    output: Segmentation,
    packaged: HashMap<Url, String>,
    resolver: &'r mut dyn AssetResolver,
}

impl Segmenter {
    pub fn new(base_url: Url, options: SegmentOptions) -> Self {
        Self { base_url, options }
    }

    /// Segment the `body` subtree of `root`, or the whole tree when no body
    /// element exists.
    pub fn segment_document<N: DocNode>(
        &self,
        root: N,
        resolver: &mut dyn AssetResolver,
    ) -> Segmentation {
        match find_body(root) {
            Some(body) => self.segment(body, resolver),
            None => {
                book_warn!("No body element found, segmenting from the document root");
                self.segment(root, resolver)
            }
        }
    }

    /// Segment the subtree rooted at `root`.
    pub fn segment<N: DocNode>(&self, root: N, resolver: &mut dyn AssetResolver) -> Segmentation {
        let mut walk = Walk {
            state: SegmentationState::new(self.options.initial_title.clone()),
            output: Segmentation::default(),
            packaged: HashMap::new(),
            resolver,
        };
        self.visit(root, &mut walk);
        if let Some(section) = walk.state.finish() {
            walk.output.sections.push(section);
        }
        walk.output
    }

    fn visit<N: DocNode>(&self, node: N, walk: &mut Walk<'_>) {
        match node.kind() {
            NodeKind::Text => {
                if let Some(text) = node.text() {
                    walk.state.push_text(text);
                }
            }
            NodeKind::Element => {
                let tag = node.tag_name().unwrap_or_default();
                if self.is_boundary(tag) {
                    self.start_section(node, walk);
                    // Heading text lives in the title only.
                    self.embed_heading_images(node, walk);
                    return;
                }
                if tag.eq_ignore_ascii_case("img") {
                    self.embed_image(node, walk);
                }
            }
            NodeKind::Other => {}
        }

        for child in node.children() {
            self.visit(child, walk);
        }
    }

    fn is_boundary(&self, tag: &str) -> bool {
        self.options
            .boundary_tags
            .iter()
            .any(|boundary| boundary.eq_ignore_ascii_case(tag))
    }

    fn start_section<N: DocNode>(&self, heading: N, walk: &mut Walk<'_>) {
        let mut title = extract_title(heading);
        if title.is_empty() {
            title = self.options.fallback_title.clone();
        }
        book_debug!("Section boundary, next title {:?}", title);
        if let Some(section) = walk.state.begin_section(title) {
            walk.output.sections.push(section);
        }
    }

    /// Images nested in a boundary heading open the new section's body.
    fn embed_heading_images<N: DocNode>(&self, node: N, walk: &mut Walk<'_>) {
        for child in node.children() {
            if child.is_element("img") {
                self.embed_image(child, walk);
            }
            self.embed_heading_images(child, walk);
        }
    }

    fn embed_image<N: DocNode>(&self, image: N, walk: &mut Walk<'_>) {
        let Some(src) = image.attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
            book_debug!("Image without src skipped");
            return;
        };

        let url = match self.base_url.join(src) {
            Ok(url) => url,
            Err(err) => {
                book_warn!("Could not parse image URL '{}': {}", src, err);
                return;
            }
        };

        if let Some(packaged_path) = walk.packaged.get(&url) {
            book_debug!("Image {} already packaged as {}", url, packaged_path);
            walk.state.push_image(packaged_path);
            return;
        }

        match walk.resolver.resolve(&url) {
            Ok(resolved) => {
                walk.state.push_image(&resolved.packaged_path);
                walk.packaged
                    .insert(url.clone(), resolved.packaged_path.clone());
                walk.output.assets.push(AssetReference {
                    remote_url: url,
                    local_path: resolved.local_path,
                    packaged_path: resolved.packaged_path,
                });
            }
            Err(err) => {
                book_warn!("Skipping image '{}': {}", url, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_text_leaves_state_untouched() {
        let mut state = SegmentationState::new("Chapter 1");
        state.push_text(" \n\t ");
        assert!(state.is_empty());
        assert!(state.finish().is_none());
    }

    #[test]
    fn every_text_node_becomes_its_own_paragraph() {
        let mut state = SegmentationState::new("Chapter 1");
        state.push_text("  one ");
        state.push_text("two");
        assert_eq!(state.body(), "<p>one </p>\n<p>two </p>");
        assert!(state.ends_with_paragraph());
    }

    #[test]
    fn begin_section_flushes_with_previous_title() {
        let mut state = SegmentationState::new("Chapter 1");
        state.push_text("intro");
        let flushed = state.begin_section("Next".to_string()).expect("section");
        assert_eq!(flushed.title, "Chapter 1");
        assert_eq!(flushed.body, "<p>intro </p>");
        assert!(state.is_empty());
        assert_eq!(state.current_title(), "Next");
    }

    #[test]
    fn begin_section_on_empty_body_only_renames() {
        let mut state = SegmentationState::new("Chapter 1");
        assert!(state.begin_section("Next".to_string()).is_none());
        assert_eq!(state.current_title(), "Next");
    }

    #[test]
    fn default_options_split_on_h3() {
        let options = SegmentOptions::default();
        assert_eq!(options.boundary_tags, vec!["h3".to_string()]);
        assert_eq!(options.initial_title, "Chapter 1");
        assert_eq!(options.fallback_title, "Unnamed Section");
    }
}
