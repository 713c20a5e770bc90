//! Markdown to HTML conversion and the standalone page template.

use std::collections::HashMap;

use chrono::NaiveDate;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd};

use super::FrontMatter;

/// Render a markdown body to an HTML fragment.
///
/// Headings without an explicit `{#id}` get a slug id, and absolute links
/// open in a new tab.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES;

    let events: Vec<Event<'_>> = Parser::new_ext(markdown, options).collect();
    let events = assign_heading_ids(events);
    let events = open_external_links_in_new_tab(events);

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    html
}

fn assign_heading_ids(mut events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut used: HashMap<String, usize> = HashMap::new();

    for i in 0..events.len() {
        let slug = match &events[i] {
            Event::Start(Tag::Heading { id: Some(id), .. }) => {
                used.entry(id.to_string()).or_insert(1);
                continue;
            }
            Event::Start(Tag::Heading { id: None, .. }) => slugify(&heading_text(&events[i + 1..])),
            _ => continue,
        };

        let slug = unique_slug(&mut used, slug);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slug));
        }
    }

    events
}

/// Plain text of a heading, up to its closing tag.
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}

/// Lowercase, alphanumerics kept, runs of anything else collapsed to `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// First free id among `base`, `base-1`, `base-2`, ...
///
/// `used` maps each base slug to the next suffix to try, and also holds every
/// id already emitted so a literal `notes-1` heading cannot collide with a
/// generated one.
fn unique_slug(used: &mut HashMap<String, usize>, base: String) -> String {
    if !used.contains_key(&base) {
        used.insert(base.clone(), 1);
        return base;
    }

    let mut suffix = used.get(&base).copied().unwrap_or(1);
    let candidate = loop {
        let candidate = format!("{}-{}", base, suffix);
        suffix += 1;
        if !used.contains_key(&candidate) {
            break candidate;
        }
    };
    used.insert(base, suffix);
    used.insert(candidate.clone(), 1);
    candidate
}

fn is_external(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn open_external_links_in_new_tab(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut external_stack: Vec<bool> = Vec::new();

    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) if is_external(&dest_url) => {
                external_stack.push(true);
                let title_attr = if title.is_empty() {
                    String::new()
                } else {
                    format!(" title=\"{}\"", escape_html(&title))
                };
                Event::InlineHtml(CowStr::from(format!(
                    "<a href=\"{}\"{} target=\"_blank\" rel=\"noopener noreferrer\">",
                    escape_html(&dest_url),
                    title_attr
                )))
            }
            Event::Start(Tag::Link { .. }) => {
                external_stack.push(false);
                event
            }
            Event::End(TagEnd::Link) => {
                if external_stack.pop() == Some(true) {
                    Event::InlineHtml(CowStr::Borrowed("</a>"))
                } else {
                    event
                }
            }
            other => other,
        })
        .collect()
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn display_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => format!(
            "<time datetime=\"{}\">{}</time>",
            date.format("%Y-%m-%d"),
            date.format("%B %-d, %Y")
        ),
        Err(_) => escape_html(raw),
    }
}

/// Wrap rendered content in a standalone HTML document.
pub fn page(matter: &FrontMatter, content: &str) -> String {
    let title = escape_html(&matter.title);
    let description = escape_html(&matter.description);
    let pub_date = display_date(&matter.pub_date);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1.0">
	<title>{title}</title>
	<meta name="description" content="{description}">
</head>
<body>
	<h1 class="title">{title}</h1>
	<p class="description">{description}</p>
	<p class="pubDate">{pub_date}</p>
	<div class="content">
{content}
	</div>
</body>
</html>
"#
    )
}
