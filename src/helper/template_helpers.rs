use crate::models::{Badge, Post};

/// Applies the fixed placeholder set to a message template. The set of
/// tokens is small and enumerated (%USER%, %POST%, %CATEGORY%, %BADGE%), so
/// this stays a keyed substitution rather than a template engine.
pub fn apply(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut body = template.to_string();
    for (token, value) in substitutions {
        body = body.replace(token, value);
    }
    body
}

/// Markdown link to a badge page, substituted for %BADGE%.
pub fn badge_link(base_url: &str, badge: &Badge) -> String {
    format!(
        "[{}]({}/badges/{}/{})",
        badge.name, base_url, badge.id, badge.slug
    )
}

/// Absolute URL of a post, substituted for %POST%.
pub fn post_link(base_url: &str, post: &Post) -> String {
    format!("{}{}", base_url, post.url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_known_tokens() {
        let body = apply(
            "Hi %USER%, see %POST% in %CATEGORY%.",
            &[
                ("%USER%", "alice"),
                ("%POST%", "http://forum/t/7/1"),
                ("%CATEGORY%", "Showcase"),
            ],
        );
        assert_eq!(body, "Hi alice, see http://forum/t/7/1 in Showcase.");
    }

    #[test]
    fn unknown_tokens_are_left_alone() {
        assert_eq!(apply("keep %OTHER%", &[("%USER%", "a")]), "keep %OTHER%");
    }

    #[test]
    fn badge_link_includes_id_and_slug() {
        let badge = Badge {
            id: 3,
            name: "First Approval".to_string(),
            slug: "first-approval".to_string(),
            enabled: true,
        };
        assert_eq!(
            badge_link("http://forum", &badge),
            "[First Approval](http://forum/badges/3/first-approval)"
        );
    }
}
