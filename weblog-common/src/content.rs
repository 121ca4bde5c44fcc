//! Upload reference scanning.
//!
//! Post content is an opaque HTML blob, but embedded image URLs point
//! into the upload path space. When a post is deleted, every file it
//! references has to be cleaned up, so the content is scanned for
//! `/uploads/...` substrings.

pub const UPLOAD_PUBLIC_PREFIX: &str = "/uploads/";

/// True for characters that can appear in a stored upload file name.
#[must_use]
pub fn is_upload_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Extracts every distinct upload reference from a content blob, in
/// order of first appearance.
#[must_use]
pub fn upload_refs(content: &str) -> Vec<&str> {
    let mut refs = Vec::new();

    for (start, _) in content.match_indices(UPLOAD_PUBLIC_PREFIX) {
        let name_start = start + UPLOAD_PUBLIC_PREFIX.len();
        let tail = &content[name_start..];
        let name_len = tail
            .find(|c: char| !is_upload_name_char(c))
            .unwrap_or(tail.len());

        if name_len == 0 {
            continue;
        }

        let reference = &content[start..name_start + name_len];
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_references_from_html() {
        let content = r#"<p>hi</p><img src="/uploads/abc-123.png"><img src='/uploads/def.jpg'>"#;

        assert_eq!(
            upload_refs(content),
            ["/uploads/abc-123.png", "/uploads/def.jpg"]
        );
    }

    #[test]
    fn ignores_content_without_references() {
        assert_eq!(upload_refs("<p>no images here</p>"), Vec::<&str>::new());
        assert_eq!(upload_refs(""), Vec::<&str>::new());
    }

    #[test]
    fn ignores_a_bare_prefix() {
        assert_eq!(upload_refs(r#"<a href="/uploads/">all</a>"#), Vec::<&str>::new());
    }

    #[test]
    fn stops_at_the_first_foreign_character() {
        let content = r#"src="/uploads/pic.png?width=40""#;
        assert_eq!(upload_refs(content), ["/uploads/pic.png"]);
    }

    #[test]
    fn deduplicates_repeated_references() {
        let content = "/uploads/a.png /uploads/a.png /uploads/b.png";
        assert_eq!(upload_refs(content), ["/uploads/a.png", "/uploads/b.png"]);
    }
}
