use std::collections::HashSet;

/// Strips all HTML tags from a string, leaving only the plain text content.
/// Used for topic titles, where tags should be removed entirely rather than
/// escaped into visible entities.
pub fn strip_all_html(input: &str) -> String {
    ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_text() {
        assert_eq!(strip_all_html("<b>hello</b> world"), "hello world");
        assert_eq!(strip_all_html("<script>alert(1)</script>plain"), "plain");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(strip_all_html("My build showcase"), "My build showcase");
    }
}
