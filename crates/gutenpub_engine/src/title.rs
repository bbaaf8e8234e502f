use crate::node::DocNode;

/// Concatenate every descendant text node, each trimmed, with no separator.
///
/// Returns an empty string when the node has no text descendants; callers
/// pick their own fallback.
pub fn extract_title<N: DocNode>(node: N) -> String {
    let mut title = String::new();
    collect_text(node, &mut title);
    title
}

fn collect_text<N: DocNode>(node: N, out: &mut String) {
    if let Some(text) = node.text() {
        out.push_str(text.trim());
    }
    for child in node.children() {
        collect_text(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::extract_title;
    use crate::node::{find_body, parse_document, DocNode};

    fn first_heading_title(html: &str) -> String {
        let doc = parse_document(html);
        let body = find_body(doc.tree.root()).expect("body");
        let heading = body
            .children()
            .find(|child| child.is_element("h3"))
            .expect("heading");
        extract_title(heading)
    }

    #[test]
    fn nested_text_is_trimmed_and_joined_without_separator() {
        let title = first_heading_title("<body><h3>  Chapter <em> One </em>\n</h3></body>");
        assert_eq!(title, "ChapterOne");
    }

    #[test]
    fn heading_without_text_yields_empty_string() {
        assert_eq!(first_heading_title("<body><h3><img src=\"x.png\"></h3></body>"), "");
    }
}
