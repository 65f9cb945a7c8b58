//! Small HTML helpers shared by the renderer and the document shell.

use sd_common::anchor_slug;

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Anchor id of a bookmarked value.
///
/// Jump cells and the cells (or section headers) they point to must agree on
/// this id, so every producer goes through here.
pub fn bookmark_id(namespace: &str, value: &str) -> String {
    format!("{}-{}", anchor_slug(namespace), anchor_slug(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape(r#""quoted""#), "&quot;quoted&quot;");
    }

    #[test]
    fn test_bookmark_id() {
        assert_eq!(bookmark_id("rule", "In from AD - User Join"), "rule-in-from-ad-user-join");
        assert_eq!(bookmark_id("Connector", "{5E2F}"), "connector-5e2f");
    }
}
