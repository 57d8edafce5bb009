use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::path::Path;

/// Maximum length of a preview, in characters.
pub const PREVIEW_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub preview: String,
}

/// Derive the display title and preview for a Markdown file.
pub fn extract(content: &str, filename: &str) -> Extracted {
    Extracted {
        title: extract_title(content, filename),
        preview: extract_preview(content),
    }
}

/// Title of a Markdown document.
///
/// Uses the first line of the form `#… text` (one or more `#`, a space,
/// then text). Falls back to `filename` without its extension.
pub fn extract_title(content: &str, filename: &str) -> String {
    content
        .lines()
        .find_map(heading_text)
        .map(str::to_string)
        .unwrap_or_else(|| strip_extension(filename))
}

fn heading_text(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches('#');
    if rest.len() == line.len() {
        return None;
    }

    let text = rest.strip_prefix(' ')?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn strip_extension(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

/// Plain-text excerpt of a Markdown document.
///
/// Headings are dropped, inline markup is unwrapped (link text is kept,
/// URLs are not), list markers disappear and whitespace is collapsed.
/// The result is cut at [`PREVIEW_MAX_CHARS`] characters. Never fails:
/// malformed Markdown is still parsed to some sequence of text events.
pub fn extract_preview(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut text = String::with_capacity(content.len().min(4 * PREVIEW_MAX_CHARS));
    let mut heading_depth = 0usize;

    for event in Parser::new_ext(content, options) {
        match event {
            Event::Start(Tag::Heading { .. }) => heading_depth += 1,
            Event::End(TagEnd::Heading(_)) => heading_depth = heading_depth.saturating_sub(1),
            _ if heading_depth > 0 => {}
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak | Event::Rule => text.push(' '),
            Event::End(
                TagEnd::Paragraph | TagEnd::Item | TagEnd::CodeBlock | TagEnd::TableCell,
            ) => text.push(' '),
            _ => {}
        }

        // Enough material for a preview; the rest of the document is irrelevant.
        if text.len() > 8 * PREVIEW_MAX_CHARS {
            break;
        }
    }

    collapse_whitespace(&text)
        .chars()
        .take(PREVIEW_MAX_CHARS)
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
