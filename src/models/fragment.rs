use serde::{Deserialize, Serialize};

/// A named block of text in one of the registries.
///
/// Ignore templates and guardrail technologies share this shape; their slugs are
/// unique only within their own namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub slug: String,
    pub name: String,
    /// Free-text grouping label shown next to search results.
    #[serde(default)]
    pub category: String,
    /// Alternate search terms.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A guardrail technology. Its body is markdown with `## <Category name>` sections.
pub type Technology = Fragment;

impl Fragment {
    /// Case-insensitive search match on slug, name and aliases.
    ///
    /// `include_category` additionally matches the grouping label, which the
    /// ignore-template search does and the technology search does not.
    pub fn matches(&self, query: &str, include_category: bool) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.slug.contains(&query)
            || self.name.to_lowercase().contains(&query)
            || self
                .aliases
                .iter()
                .any(|a| a.to_lowercase().contains(&query))
            || (include_category && self.category.to_lowercase().contains(&query))
    }
}

/// A guardrail category. `name` must match a technology's `## ` header exactly
/// for that section to be merged under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub slug: String,
    pub name: String,
}

/// Contents of `guardrails/index.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailsIndex {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub technologies: Vec<Technology>,
}

/// Whether `slug` is made only of `[a-z0-9-]` and is non-empty.
///
/// Codec output relies on this: list values are comma-joined without encoding.
pub fn is_slug_syntax(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
