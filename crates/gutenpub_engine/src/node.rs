//! Minimal view of a parsed document tree.
//!
//! The segmentation engine only needs to know a node's kind, its tag name,
//! one attribute lookup, its text and its ordered children. [`DocNode`] exposes
//! exactly that, so the engine runs the same over a `scraper` tree or any other
//! tree that implements it.

use ego_tree::NodeRef;
use scraper::{Html, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    /// Document root, doctype, comments and processing instructions.
    Other,
}

pub trait DocNode: Copy {
    type Children: Iterator<Item = Self>;

    fn kind(&self) -> NodeKind;

    /// Local tag name for elements, `None` otherwise.
    fn tag_name(&self) -> Option<&str>;

    /// First value of the named attribute.
    fn attr(&self, name: &str) -> Option<&str>;

    /// Raw content for text nodes, `None` otherwise.
    fn text(&self) -> Option<&str>;

    fn children(&self) -> Self::Children;

    fn is_element(&self, tag: &str) -> bool {
        self.kind() == NodeKind::Element
            && self
                .tag_name()
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }
}

impl<'a> DocNode for NodeRef<'a, Node> {
    type Children = ego_tree::iter::Children<'a, Node>;

    fn kind(&self) -> NodeKind {
        match self.value() {
            Node::Element(_) => NodeKind::Element,
            Node::Text(_) => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn tag_name(&self) -> Option<&str> {
        match self.value() {
            Node::Element(element) => Some(element.name()),
            _ => None,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        match self.value() {
            Node::Element(element) => element.attr(name),
            _ => None,
        }
    }

    fn text(&self) -> Option<&str> {
        match self.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        }
    }

    fn children(&self) -> Self::Children {
        NodeRef::children(self)
    }
}

/// Parse a full HTML document. html5ever recovers from any input, so this
/// never fails.
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// First `body` element in pre-order, if any.
pub fn find_body<N: DocNode>(root: N) -> Option<N> {
    if root.is_element("body") {
        return Some(root);
    }
    root.children().find_map(find_body::<N>)
}
