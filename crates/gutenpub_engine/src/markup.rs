/// Neutralise markup-significant characters so text is never read as tags.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `<p>{text} </p>`; the trailing space keeps adjacent runs apart once
/// reflowed by a reader.
pub fn text_paragraph(trimmed: &str) -> String {
    format!("<p>{} </p>", escape_text(trimmed))
}

pub fn image_paragraph(packaged_path: &str) -> String {
    format!(
        r#"<p><img src="{}" alt="Image"/></p>"#,
        escape_text(packaged_path)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_markup_characters() {
        assert_eq!(
            escape_text(r#"a < b & "c" > 'd'"#),
            "a &lt; b &amp; &quot;c&quot; &gt; &#39;d&#39;"
        );
    }

    #[test]
    fn text_paragraph_wraps_escaped_text() {
        assert_eq!(text_paragraph("<b>"), "<p>&lt;b&gt; </p>");
    }

    #[test]
    fn image_paragraph_references_packaged_path() {
        assert_eq!(
            image_paragraph("../images/a.png"),
            r#"<p><img src="../images/a.png" alt="Image"/></p>"#
        );
    }
}
