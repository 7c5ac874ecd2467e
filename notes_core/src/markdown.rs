//! Markdown to HTML for note bodies.
//!
//! Notes.app stores bodies as HTML. Input is CommonMark plus the `extra`
//! plugin set (tables, strikethrough, linkify, fenced-code highlighting).

use markdown_it::MarkdownIt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

fn parser() -> MarkdownIt {
    let mut md = MarkdownIt::new();
    markdown_it::plugins::cmark::add(&mut md);
    markdown_it::plugins::extra::add(&mut md);
    md
}

/// Render Markdown as HTML. Parser panics fall back to [`plain_text_html`].
pub fn markdown_to_html(source: &str) -> String {
    render_or_escape(source, || parser().parse(source).render())
}

fn render_or_escape<F: FnOnce() -> String>(source: &str, render: F) -> String {
    match catch_unwind(AssertUnwindSafe(render)) {
        Ok(html) => html,
        Err(_) => {
            warn!("Markdown rendering failed, storing body as plain text");
            plain_text_html(source)
        }
    }
}

/// Escaped text with line breaks kept as `<br>`.
pub fn plain_text_html(source: &str) -> String {
    html_escape::encode_text(source).replace('\n', "<br>")
}
