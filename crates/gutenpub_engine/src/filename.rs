use url::Url;

/// Cache filename for an asset URL: the last path segment, sanitised.
///
/// A trivial path (`""`, `/`, `.`) falls back to `image_{host}.tmp` with the
/// host's dots turned into underscores. `%` is replaced too, so an href built
/// from the name never depends on percent-decoding.
pub fn asset_filename(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let name = if segment.is_empty() || segment == "." || segment == "/" {
        let host = url.host_str().unwrap_or("unknown");
        format!("image_{}.tmp", host.replace('.', "_"))
    } else {
        segment.to_string()
    };
    sanitize(&name)
}

fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' | '\0'..='\u{1F}'
    )
}

#[cfg(test)]
mod tests {
    use super::asset_filename;
    use url::Url;

    fn name(url: &str) -> String {
        asset_filename(&Url::parse(url).unwrap())
    }

    #[test]
    fn uses_last_path_segment() {
        assert_eq!(name("https://gutenberg.org/files/1184/images/cover.jpg"), "cover.jpg");
        assert_eq!(name("https://gutenberg.org/a.png?size=2"), "a.png");
    }

    #[test]
    fn trivial_path_falls_back_to_host_name() {
        assert_eq!(name("https://img.example.com/"), "image_img_example_com.tmp");
        assert_eq!(name("https://img.example.com"), "image_img_example_com.tmp");
    }

    #[test]
    fn unsafe_characters_become_underscores() {
        assert_eq!(name("https://x.org/a:b*c.png"), "a_b_c.png");
        assert_eq!(name("https://x.org/a%3Fb.png"), "a_3Fb.png");
        assert_eq!(name("https://x.org/a b.png"), "a_20b.png");
    }
}
