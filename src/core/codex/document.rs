//! Outline reader for registry files.
//!
//! Turns Markdown into the minimal tree the registry needs: headings become
//! [`Section`]s and bullet lists become nested [`OutlineItem`]s. Inline markup
//! is flattened to plain text.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

/// A bullet item and everything nested under it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineItem {
    pub text: String,
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: OutlineItem) -> Self {
        self.children.push(child);
        self
    }
}

/// A heading and the top-level items below it, up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading depth, 1 for `#`.
    pub level: u8,
    pub title: String,
    pub items: Vec<OutlineItem>,
}

/// One parsed registry file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// File name or other label, used in diagnostics and provenance.
    pub source: String,
    /// Items that appear before the first heading.
    pub preamble: Vec<OutlineItem>,
    pub sections: Vec<Section>,
}

impl Document {
    /// Parse Markdown text into an outline.
    pub fn parse(source: impl Into<String>, markdown: &str) -> Self {
        let mut document = Document {
            source: source.into(),
            ..Default::default()
        };

        let mut heading: Option<(u8, String)> = None;
        let mut stack: Vec<OutlineItem> = Vec::new();

        for event in Parser::new(markdown) {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    heading = Some((heading_depth(level), String::new()));
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((level, title)) = heading.take() {
                        document.sections.push(Section {
                            level,
                            title: title.trim().to_string(),
                            items: Vec::new(),
                        });
                    }
                }
                Event::Start(Tag::Item) => stack.push(OutlineItem::default()),
                Event::End(TagEnd::Item) => {
                    let Some(mut item) = stack.pop() else {
                        continue;
                    };
                    item.text = item.text.trim().to_string();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(item),
                        None => match document.sections.last_mut() {
                            Some(section) => section.items.push(item),
                            None => document.preamble.push(item),
                        },
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, title)) = heading.as_mut() {
                        title.push_str(&text);
                    } else if let Some(item) = stack.last_mut() {
                        item.text.push_str(&text);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some(item) = stack.last_mut() {
                        item.text.push(' ');
                    }
                }
                _ => {}
            }
        }

        document
    }
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
