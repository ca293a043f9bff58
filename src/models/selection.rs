use super::{Format, Shell};

/// Which share URL / endpoint a query string belongs to. The same key means
/// different things on different surfaces (`t` is templates on the ignore
/// path but technologies on the guardrails page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Ignore,
    Guardrails,
    Init,
}

/// A caller's selection: the single unit of request intent.
///
/// Order of `templates` and `technologies` is significant (it is echoed in headers
/// and share URLs). `categories` is `None` when every category is active, which
/// is the implicit default and is omitted from share URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub templates: Vec<String>,
    pub technologies: Vec<String>,
    pub categories: Option<Vec<String>>,
    pub format: Format,
    pub shell: Shell,
}

impl SelectionState {
    /// Append a template slug unless it is already selected.
    pub fn add_template(&mut self, slug: &str) -> bool {
        push_unique(&mut self.templates, slug)
    }

    /// Append a technology slug unless it is already selected.
    pub fn add_technology(&mut self, slug: &str) -> bool {
        push_unique(&mut self.technologies, slug)
    }

    /// Whether `slug` is an active category. Everything is active when no
    /// subset was given.
    pub fn category_active(&self, slug: &str) -> bool {
        match &self.categories {
            Some(active) => active.iter().any(|c| c == slug),
            None => true,
        }
    }
}

/// Normalize (trim, lowercase) and append if absent. Empty input is ignored.
pub fn push_unique(list: &mut Vec<String>, slug: &str) -> bool {
    let slug = slug.trim().to_lowercase();
    if slug.is_empty() || list.contains(&slug) {
        return false;
    }
    list.push(slug);
    true
}
