//! Markdown rendering with syntax highlighting

use anyhow::Result;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::BlogConfig;

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
    hard_breaks: bool,
    toc_marker: String,
}

/// One heading collected for the table of contents
#[derive(Debug, Clone, PartialEq)]
struct TocEntry {
    level: usize,
    anchor: String,
    text: String,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: "base16-ocean.dark".to_string(),
            line_numbers: false,
            hard_breaks: true,
            toc_marker: "[TOC]".to_string(),
        }
    }

    /// Create with the highlight and markdown settings from the blog config
    pub fn from_config(config: &BlogConfig) -> Self {
        Self {
            theme_name: config.highlight.theme.clone(),
            line_numbers: config.highlight.line_numbers,
            hard_breaks: config.markdown.hard_breaks,
            toc_marker: config.markdown.toc_marker.clone(),
            ..Self::new()
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String> {
        // Front-matter is stripped before we get here, so no metadata blocks
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_DEFINITION_LIST;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(info) => fence_language(&info),
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted =
                        self.highlight_code(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                Event::SoftBreak if self.hard_breaks => {
                    events.push(Event::HardBreak);
                }
                _ => events.push(event),
            }
        }

        let toc = assign_heading_ids(&mut events);
        self.insert_toc(&mut events, &toc);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(html_output)
    }

    /// Replace every paragraph that holds only the TOC marker
    fn insert_toc(&self, events: &mut Vec<Event>, toc: &[TocEntry]) {
        let mut i = 0;
        while i < events.len() {
            if matches!(events[i], Event::Start(Tag::Paragraph)) {
                let Some(len) = events[i..]
                    .iter()
                    .position(|e| matches!(e, Event::End(TagEnd::Paragraph)))
                else {
                    break;
                };
                let end = i + len;
                if paragraph_text(&events[i + 1..end]).as_deref() == Some(self.toc_marker.as_str())
                {
                    events.drain(i + 1..=end);
                    events[i] = Event::Html(CowStr::from(toc_html(toc)));
                }
            }
            i += 1;
        }
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        // Try to find syntax for the language
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme
            .and_then(|theme| {
                highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
            })
            .unwrap_or_else(|| format!("<pre><code>{}</code></pre>", html_escape(code)));

        if self.line_numbers {
            add_line_numbers(&highlighted, code.lines().count(), lang)
        } else {
            format!(
                r#"<div class="codehilite language-{}">{}</div>"#,
                lang, highlighted
            )
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// First word of a fence info string, limited to characters safe in a class name
fn fence_language(info: &str) -> Option<String> {
    let lang: String = info
        .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '#' | '_' | '.'))
        .collect();
    if lang.is_empty() {
        None
    } else {
        Some(lang)
    }
}

/// Wrap highlighted code in a table with a line number gutter
fn add_line_numbers(highlighted: &str, line_count: usize, lang: &str) -> String {
    let gutter = (1..=line_count.max(1))
        .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<div class="codehilite language-{}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></div>"#,
        lang, gutter, highlighted
    )
}

/// Give every heading a unique `id` and return them in document order
fn assign_heading_ids(events: &mut [Event]) -> Vec<TocEntry> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut toc = Vec::new();

    let mut i = 0;
    while i < events.len() {
        let heading = match &events[i] {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => Some((*level, id.clone(), classes.clone(), attrs.clone())),
            _ => None,
        };

        if let Some((level, id, classes, attrs)) = heading {
            let end = events[i..]
                .iter()
                .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
                .map(|p| i + p)
                .unwrap_or(events.len());
            let text = plain_text(&events[i + 1..end]);

            let base = match id {
                Some(id) => id.to_string(),
                None => slug::slugify(&text),
            };
            let anchor = unique_anchor(&mut seen, base);

            toc.push(TocEntry {
                level: level as usize,
                anchor: anchor.clone(),
                text,
            });
            events[i] = Event::Start(Tag::Heading {
                level,
                id: Some(CowStr::from(anchor)),
                classes,
                attrs,
            });
            i = end;
        }
        i += 1;
    }

    toc
}

fn unique_anchor(seen: &mut HashMap<String, usize>, base: String) -> String {
    let base = if base.is_empty() {
        "section".to_string()
    } else {
        base
    };

    let Some(&used) = seen.get(&base) else {
        seen.insert(base.clone(), 0);
        return base;
    };

    let mut n = used;
    loop {
        n += 1;
        let candidate = format!("{}-{}", base, n);
        if !seen.contains_key(&candidate) {
            seen.insert(candidate.clone(), 0);
            seen.insert(base, n);
            return candidate;
        }
    }
}

fn plain_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        if let Event::Text(t) | Event::Code(t) = event {
            text.push_str(t);
        }
    }
    text
}

/// Trimmed paragraph text, or None if the paragraph holds anything but text
fn paragraph_text(events: &[Event]) -> Option<String> {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) => text.push_str(t),
            _ => return None,
        }
    }
    Some(text.trim().to_string())
}

/// Nested list of heading links
fn toc_html(entries: &[TocEntry]) -> String {
    let mut html = String::from(r#"<div class="toc">"#);
    let mut stack: Vec<usize> = Vec::new();

    for entry in entries {
        match stack.last() {
            Some(&top) if entry.level > top => {
                html.push_str("<ul>");
                stack.push(entry.level);
            }
            Some(_) => {
                html.push_str("</li>");
                while stack.len() > 1 && entry.level <= stack[stack.len() - 2] {
                    stack.pop();
                    html.push_str("</ul></li>");
                }
            }
            None => {
                html.push_str("<ul>");
                stack.push(entry.level);
            }
        }
        html.push_str(&format!(
            r##"<li><a href="#{}">{}</a>"##,
            entry.anchor,
            html_escape(&entry.text)
        ));
    }

    if !stack.is_empty() {
        html.push_str("</li>");
        while stack.len() > 1 {
            stack.pop();
            html.push_str("</ul></li>");
        }
        html.push_str("</ul>");
    }

    html.push_str("</div>");
    html
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
