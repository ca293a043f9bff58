//! Markdown section extraction for technology guardrail files.
//!
//! A technology file looks like:
//!
//! ```text
//! # React
//! Free-text description, ignored here.
//!
//! ## Testing
//! - Use React Testing Library
//!
//! ## Security
//! - Never use dangerouslySetInnerHTML with user input
//! ```
//!
//! Each `## ` header starts a section keyed by its trimmed title.

use std::collections::BTreeMap;

/// Header title to section body. A repeated title keeps the later body.
pub type Sections = BTreeMap<String, String>;

enum ScanState<'a> {
    BeforeFirstHeader,
    InSection { title: String, body: Vec<&'a str> },
}

/// Parse `markdown` into its level-2 sections.
///
/// Lines before the first header are dropped. Body lines are kept verbatim,
/// blank lines included, and only leading and trailing blank lines are
/// removed. Line endings may be `\n` or `\r\n`.
pub fn extract(markdown: &str) -> Sections {
    let mut sections = Sections::new();
    let mut state = ScanState::BeforeFirstHeader;

    for line in markdown.lines() {
        if let Some(title) = header_title(line) {
            if let ScanState::InSection { title: previous, body } = state {
                sections.insert(previous, join_body(&body));
            }
            state = ScanState::InSection {
                title: title.to_string(),
                body: Vec::new(),
            };
        } else if let ScanState::InSection { body, .. } = &mut state {
            body.push(line);
        }
    }

    if let ScanState::InSection { title, body } = state {
        sections.insert(title, join_body(&body));
    }

    sections
}

/// `##`, at least one whitespace character, then at least one more character.
///
/// `### Sub` is not a level-2 header, and neither is a bare `## `. A header of
/// only whitespace (`##   `) is accepted with an empty title.
fn header_title(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_whitespace() || chars.next().is_none() {
        return None;
    }
    Some(rest.trim())
}

fn join_body(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
