//! Document composition for the ignore-file and rules paths.
//!
//! Composition is pure: fragment text has already been fetched and slugs have
//! already been validated. Each function takes the normalized selection so the
//! generated header echoes exactly what was composed.

use crate::models::{Category, ComposedDocument, DocumentKind, SelectionState, Shell, Surface};
use crate::sections::Sections;

/// Shown instead of an ignore file when nothing is selected.
pub const IGNORE_PLACEHOLDER: &str = "# Select at least one template to generate your ignore file";
/// Shown instead of a rules file when every category is disabled.
pub const RULES_PLACEHOLDER: &str = "# Enable at least one category to generate rules";

/// Command that re-fetches an ignore file from the API.
pub fn ignore_command(selection: &SelectionState, host: &str) -> String {
    let options = SelectionState {
        templates: Vec::new(),
        ..selection.clone()
    };
    format!(
        "curl -L {}/api/{}?{}",
        host,
        selection.templates.join(","),
        options.to_query(Surface::Ignore)
    )
}

/// Command that re-fetches a rules file from the API.
pub fn rules_command(selection: &SelectionState, host: &str) -> String {
    let options = SelectionState {
        technologies: Vec::new(),
        ..selection.clone()
    };
    format!(
        "curl -L {}/api/guardrails/{}?{}",
        host,
        selection.technologies.join(","),
        options.to_query(Surface::Guardrails)
    )
}

/// Command that pipes an installer script into its interpreter.
pub fn init_command(selection: &SelectionState, host: &str) -> String {
    let url = format!("{}/api/init?{}", host, selection.to_query(Surface::Init));
    match selection.shell {
        Shell::Sh => format!("curl -sL \"{}\" | sh", url),
        Shell::Ps => format!("iex (iwr \"{}\").Content", url),
    }
}

/// Concatenate ignore templates in selection order under a generated header.
///
/// `parts` lines up with `selection.templates`.
pub fn compose_ignore(selection: &SelectionState, parts: Vec<String>, host: &str) -> ComposedDocument {
    let filename = selection.format.ignore_file();
    if selection.templates.is_empty() {
        return ComposedDocument::placeholder(DocumentKind::Ignore, filename, IGNORE_PLACEHOLDER);
    }

    let header = format!(
        "# === {} ===\n# Templates: {}\n# {}\n",
        filename,
        selection.templates.join(", "),
        ignore_command(selection, host)
    );

    let blocks = parts
        .into_iter()
        .map(|mut part| {
            if !part.ends_with('\n') {
                part.push('\n');
            }
            part
        })
        .collect();

    ComposedDocument::new(DocumentKind::Ignore, filename, header, blocks)
}

/// A category's generic markdown split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericRules {
    /// First `# ` line, or `# <category name>` when there is none.
    pub title: String,
    /// Non-blank lines between the title and the first rule.
    pub description: Option<String>,
    /// From the first `- ` line to the end, trailing whitespace trimmed.
    pub rules: Option<String>,
}

impl GenericRules {
    pub fn parse(text: &str, category_name: &str) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let title_at = lines.iter().position(|l| l.starts_with("# "));
        let rules_at = lines.iter().position(|l| l.starts_with("- "));

        let title = match title_at {
            Some(i) => lines[i].trim_end().to_string(),
            None => format!("# {}", category_name),
        };

        let start = title_at.map_or(0, |i| i + 1);
        let end = rules_at.unwrap_or(lines.len());
        let description: Vec<&str> = lines
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|l| !l.trim().is_empty())
            .collect();

        let rules = rules_at
            .map(|i| lines[i..].join("\n").trim_end().to_string())
            .filter(|r| !r.is_empty());

        Self {
            title,
            description: (!description.is_empty()).then(|| description.join("\n")),
            rules,
        }
    }
}

/// One active category with its generic fragment text.
#[derive(Debug, Clone)]
pub struct CategoryRules<'a> {
    pub category: &'a Category,
    pub text: &'a str,
}

/// One selected technology with its extracted sections.
#[derive(Debug, Clone)]
pub struct TechnologyOverrides {
    /// Display name used for the per-technology sub-heading.
    pub name: String,
    pub sections: Sections,
}

/// Merge generic category rules with technology overrides.
///
/// `categories` holds only the active categories, in registry order.
/// `technologies` is in selection order. A technology contributes to a
/// category when it has a section whose title equals the category name
/// exactly. A category with no rules and no overrides still emits its title.
pub fn compose_rules(
    selection: &SelectionState,
    categories: &[CategoryRules<'_>],
    technologies: &[TechnologyOverrides],
    host: &str,
) -> ComposedDocument {
    let filename = selection.format.rules_file();
    if categories.is_empty() {
        return ComposedDocument::placeholder(DocumentKind::Rules, filename, RULES_PLACEHOLDER);
    }

    let mut header = format!("# === {} ===\n# Generated by {}/guardrails\n", filename, host);
    if let Some(subset) = &selection.categories {
        header.push_str(&format!("# Categories: {}\n", subset.join(", ")));
    }
    if !selection.technologies.is_empty() {
        header.push_str(&format!(
            "# Technologies: {}\n# {}\n",
            selection.technologies.join(", "),
            rules_command(selection, host)
        ));
    }

    let blocks = categories
        .iter()
        .map(|entry| category_block(entry, technologies))
        .collect();

    ComposedDocument::new(DocumentKind::Rules, filename, header, blocks)
}

fn category_block(entry: &CategoryRules<'_>, technologies: &[TechnologyOverrides]) -> String {
    let generic = GenericRules::parse(entry.text, &entry.category.name);

    let mut block = generic.title;
    if let Some(description) = generic.description {
        block.push_str("\n\n");
        block.push_str(&description);
    }
    if let Some(rules) = generic.rules {
        block.push_str("\n\n");
        block.push_str(&rules);
    }

    for tech in technologies {
        match tech.sections.get(&entry.category.name) {
            Some(section) if !section.is_empty() => {
                block.push_str("\n\n## ");
                block.push_str(&tech.name);
                block.push('\n');
                block.push_str(section);
            }
            _ => {}
        }
    }

    block
}
