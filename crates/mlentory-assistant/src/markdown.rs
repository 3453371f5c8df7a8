//! Description cleaning (§4.11): strips code blocks and tables out of a
//! model's markdown card text and truncates long sections, for display in
//! `search_models` results.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

const MAX_SECTION_CHARS: usize = 400;
const TRUNCATION_SUFFIX: &str = "…";

/// Strip fenced code blocks and tables, flatten everything else to plain
/// text, and truncate any resulting paragraph/heading section past
/// [`MAX_SECTION_CHARS`].
#[must_use]
pub fn clean_description(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);

    let mut sections: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut skip_depth = 0usize;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(_) | Tag::Table(_)) => skip_depth += 1,
            Event::End(TagEnd::CodeBlock | TagEnd::Table) => skip_depth = skip_depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) if skip_depth == 0 => {
                current.push_str(&text);
            }
            Event::SoftBreak | Event::HardBreak if skip_depth == 0 => current.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) if skip_depth == 0 => {
                flush_section(&mut current, &mut sections);
            }
            _ => {}
        }
    }
    flush_section(&mut current, &mut sections);

    sections.join("\n\n")
}

fn flush_section(current: &mut String, sections: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sections.push(truncate_section(trimmed));
    }
    current.clear();
}

fn truncate_section(section: &str) -> String {
    if section.chars().count() <= MAX_SECTION_CHARS {
        return section.to_string();
    }
    let truncated: String = section.chars().take(MAX_SECTION_CHARS).collect();
    format!("{truncated}{TRUNCATION_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_blocks_are_stripped() {
        let md = "Intro text.\n\n```python\nprint('secret')\n```\n\nOutro text.";
        let cleaned = clean_description(md);
        assert!(!cleaned.contains("secret"));
        assert!(cleaned.contains("Intro text."));
        assert!(cleaned.contains("Outro text."));
    }

    #[test]
    fn tables_are_stripped() {
        let md = "Before.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nAfter.";
        let cleaned = clean_description(md);
        assert!(!cleaned.contains('1'));
        assert!(cleaned.contains("Before."));
        assert!(cleaned.contains("After."));
    }

    #[test]
    fn long_sections_are_truncated() {
        let long_section = "word ".repeat(200);
        let cleaned = clean_description(&long_section);
        assert!(cleaned.ends_with(TRUNCATION_SUFFIX));
        assert!(cleaned.chars().count() <= MAX_SECTION_CHARS + TRUNCATION_SUFFIX.chars().count());
    }
}
