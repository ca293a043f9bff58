use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{FragmentKey, FragmentSource, Namespace, RegistryError};
use crate::models::{Category, Fragment, GuardrailsIndex};

/// In-process registry, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySource {
    templates: Vec<Fragment>,
    guardrails: GuardrailsIndex,
    fragments: HashMap<FragmentKey, String>,
    failing: HashSet<FragmentKey>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, slug: &str, name: &str, category: &str, text: &str) -> Self {
        self.templates.push(entry(slug, name, category));
        self.fragments
            .insert(FragmentKey::new(Namespace::Templates, slug), text.to_string());
        self
    }

    pub fn with_category(mut self, slug: &str, name: &str, text: &str) -> Self {
        self.guardrails.categories.push(Category {
            slug: slug.to_string(),
            name: name.to_string(),
        });
        self.fragments
            .insert(FragmentKey::new(Namespace::Categories, slug), text.to_string());
        self
    }

    pub fn with_technology(mut self, slug: &str, name: &str, text: &str) -> Self {
        self.guardrails.technologies.push(entry(slug, name, "technology"));
        self.fragments
            .insert(FragmentKey::new(Namespace::Technologies, slug), text.to_string());
        self
    }

    /// Keep the slug listed in its index but make every fetch of it fail.
    pub fn with_failing(mut self, namespace: Namespace, slug: &str) -> Self {
        self.failing.insert(FragmentKey::new(namespace, slug));
        self
    }

    /// Number of fragment fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// A small registry covering both paths.
    pub fn sample() -> Self {
        Self::new()
            .with_template(
                "python",
                "Python",
                "language",
                "# Python\n__pycache__/\n*.pyc\n.venv/\n",
            )
            .with_template("node", "Node.js", "language", "# Node\nnode_modules/\n.env\n")
            .with_template("react", "React", "framework", "# React\nbuild/\ncoverage/\n")
            .with_category(
                "testing",
                "Testing",
                "# Testing\n\nRules for writing and running tests.\n\n- Write tests for new behavior\n- Keep tests deterministic\n",
            )
            .with_category(
                "security",
                "Security",
                "# Security\n\n- Never commit secrets\n",
            )
            .with_category("style", "Code Style", "# Code Style\n")
            .with_technology(
                "react",
                "React",
                "# React\n\nGuardrails for React projects.\n\n## Testing\n- Use React Testing Library\n\n## Security\n- Avoid dangerouslySetInnerHTML with user input\n",
            )
            .with_technology(
                "node",
                "Node.js",
                "# Node.js\n\n## Security\n- Validate all request input\n\n## Code Style\n- Prefer async/await over callbacks\n",
            )
    }
}

fn entry(slug: &str, name: &str, category: &str) -> Fragment {
    Fragment {
        slug: slug.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        aliases: Vec::new(),
    }
}

#[async_trait]
impl FragmentSource for MemorySource {
    async fn template_index(&self) -> Result<Vec<Fragment>, RegistryError> {
        Ok(self.templates.clone())
    }

    async fn guardrails_index(&self) -> Result<GuardrailsIndex, RegistryError> {
        Ok(self.guardrails.clone())
    }

    async fn fetch_fragment(&self, namespace: Namespace, slug: &str) -> Result<String, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let key = FragmentKey::new(namespace, slug);
        if self.failing.contains(&key) {
            return Err(RegistryError::Upstream {
                status: 503,
                url: namespace.fragment_path(slug),
            });
        }
        self.fragments
            .get(&key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                namespace,
                slug: slug.to_string(),
            })
    }
}
