//! Markdown report rendering

use pulldown_cmark::{html, Options, Parser};

/// Render a model response to HTML with GFM tables and strikethrough.
/// Single newlines become line breaks, matching how reports are written.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        pulldown_cmark::Event::SoftBreak => pulldown_cmark::Event::HardBreak,
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_tables() {
        let html = render_markdown("| 사안 | 조항 |\n|---|---|\n| 선물 | 3조 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>선물</td>"));
    }

    #[test]
    fn test_soft_breaks_become_br() {
        let html = render_markdown("line one\nline two");
        assert!(html.contains("<br />"));
    }
}
