// src/utils/html.rs

/// Sanitizes author-supplied catalog text with a whitelist.
///
/// Safe inline markup (`<b>`, `<p>`, links) survives; `<script>` elements are
/// removed together with their content, and event-handler attributes are
/// dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(clean_html("Intro to Algebra"), "Intro to Algebra");
    }

    #[test]
    fn event_handlers_are_stripped() {
        let cleaned = clean_html(r#"<p onclick="steal()">hi</p>"#);
        assert_eq!(cleaned, "<p>hi</p>");
    }
}
