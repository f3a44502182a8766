//! Markdown rendering for document pages and the terminal document view.

use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Render markdown to an HTML fragment.
pub fn to_html(content: &str) -> String {
    let parser = Parser::new_ext(content, options());
    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Standalone HTML page for a rendered document.
pub fn page(title: &str, body_html: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n<main>\n<article>\n{body_html}</article>\n</main>\n</body>\n</html>\n",
        escape_html(title)
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Block kinds the terminal view styles differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    #[default]
    Paragraph,
    ListItem,
    Code,
    Quote,
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub kind: BlockKind,
    pub text: String,
}

/// Flatten markdown into styled plain-text lines, with a blank line between
/// blocks.
pub fn to_lines(content: &str) -> Vec<TextLine> {
    let mut builder = LineBuilder::default();
    for event in Parser::new_ext(content, options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                builder.open(BlockKind::Heading(heading_depth(level)))
            }
            Event::Start(Tag::Paragraph) => {
                if builder.list_depth == 0 {
                    builder.open(BlockKind::Paragraph);
                }
            }
            Event::Start(Tag::List(_)) => builder.list_depth += 1,
            Event::End(TagEnd::List(_)) => {
                builder.list_depth = builder.list_depth.saturating_sub(1);
                if builder.list_depth == 0 {
                    builder.gap();
                }
            }
            Event::Start(Tag::Item) => {
                builder.open(BlockKind::ListItem);
                let indent = "  ".repeat(builder.list_depth.saturating_sub(1));
                builder.push(&format!("{indent}• "));
            }
            Event::Start(Tag::CodeBlock(_)) => builder.open(BlockKind::Code),
            Event::Start(Tag::BlockQuote) => builder.quote = true,
            Event::End(TagEnd::BlockQuote) => {
                builder.quote = false;
                builder.gap();
            }
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::CodeBlock) => builder.close(true),
            Event::End(TagEnd::Paragraph) => builder.close(builder.list_depth == 0),
            Event::End(TagEnd::Item) => builder.close(false),
            Event::Text(text) => {
                if builder.kind == BlockKind::Code {
                    builder.push_code(&text);
                } else {
                    builder.push(&text);
                }
            }
            Event::Code(code) => builder.push(&format!("`{code}`")),
            Event::SoftBreak => builder.push(" "),
            Event::HardBreak => builder.break_line(),
            Event::TaskListMarker(done) => builder.push(if done { "[x] " } else { "[ ] " }),
            Event::Rule => {
                builder.lines.push(TextLine {
                    kind: BlockKind::Rule,
                    text: "─".repeat(40),
                });
                builder.gap();
            }
            _ => {}
        }
    }
    builder.close(false);
    while builder
        .lines
        .last()
        .is_some_and(|line| line.text.is_empty() && line.kind == BlockKind::Paragraph)
    {
        builder.lines.pop();
    }
    builder.lines
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

#[derive(Default)]
struct LineBuilder {
    lines: Vec<TextLine>,
    current: String,
    kind: BlockKind,
    list_depth: usize,
    quote: bool,
}

impl LineBuilder {
    fn open(&mut self, kind: BlockKind) {
        if !self.current.is_empty() {
            self.break_line();
        }
        self.kind = if self.quote && kind == BlockKind::Paragraph {
            BlockKind::Quote
        } else {
            kind
        };
    }

    fn push(&mut self, text: &str) {
        if self.current.is_empty() && self.quote {
            self.current.push_str("│ ");
        }
        self.current.push_str(text);
    }

    fn push_code(&mut self, text: &str) {
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.break_line();
            }
            self.current.push_str(line);
        }
    }

    fn break_line(&mut self) {
        let text = std::mem::take(&mut self.current);
        self.lines.push(TextLine {
            kind: self.kind,
            text,
        });
    }

    fn close(&mut self, gap: bool) {
        if !self.current.is_empty() {
            self.break_line();
        }
        if gap {
            self.gap();
        }
        self.kind = BlockKind::default();
    }

    fn gap(&mut self) {
        if self.lines.last().is_some_and(|line| !line.text.is_empty()) {
            self.lines.push(TextLine {
                kind: BlockKind::Paragraph,
                text: String::new(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_tables() {
        let html = to_html("# Plan\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<h1>Plan</h1>"));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn page_escapes_title() {
        let page = page("<script>", "<p>x</p>\n");
        assert!(page.contains("<title>&lt;script&gt;</title>"));
        assert!(page.contains("<p>x</p>"));
    }

    #[test]
    fn lines_keep_block_structure() {
        let lines = to_lines("# Title\n\nSome *text*\nwrapped.\n\n- one\n- two\n\n```\nlet x = 1;\n```\n");
        let kinds: Vec<BlockKind> = lines
            .iter()
            .filter(|line| !line.text.is_empty())
            .map(|line| line.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading(1),
                BlockKind::Paragraph,
                BlockKind::ListItem,
                BlockKind::ListItem,
                BlockKind::Code,
            ]
        );
        assert_eq!(lines[0].text, "Title");
        assert!(lines.iter().any(|line| line.text == "Some text wrapped."));
        assert!(lines.iter().any(|line| line.text == "• one"));
        assert!(lines.iter().any(|line| line.text == "let x = 1;"));
    }
}
