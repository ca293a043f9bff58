//! The composition pipeline: validate, fetch, extract, compose, render.
//!
//! One [`Engine`] serves one request or one interactive session. It owns the
//! loaded [`Catalog`] and a [`Lookup`] cache, so repeated compositions within a
//! session only fetch what they have not seen.

use std::sync::Arc;

use thiserror::Error;

use crate::compose::{self, CategoryRules, TechnologyOverrides};
use crate::models::{ComposedDocument, SelectionState};
use crate::registry::{Catalog, FragmentKey, FragmentSource, Lookup, Namespace, RegistryError, Scope};
use crate::render::{self, Rendered};
use crate::sections;

/// How unknown slugs and failed fetches are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Server path: any unknown slug or failed fetch fails the whole request.
    Strict,
    /// Interactive path: unknown slugs are dropped, a failed template becomes
    /// an inline comment and a failed guardrail file contributes nothing.
    Lenient,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown {}: {}", .namespace.label(), .invalid.join(", "))]
    InvalidSlugs {
        namespace: Namespace,
        invalid: Vec<String>,
        /// Every valid slug in the namespace, sorted.
        available: Vec<String>,
    },

    #[error(transparent)]
    Fetch(#[from] RegistryError),
}

pub struct Engine {
    catalog: Catalog,
    lookup: Lookup,
    host: String,
    policy: Policy,
}

impl Engine {
    /// Load the indexes `scope` needs and start a session.
    pub async fn load(
        source: Arc<dyn FragmentSource>,
        scope: Scope,
        host: impl Into<String>,
        policy: Policy,
    ) -> Result<Self, RegistryError> {
        let catalog = Catalog::load(source.as_ref(), scope).await?;
        Ok(Self::new(source, catalog, host, policy))
    }

    pub fn new(source: Arc<dyn FragmentSource>, catalog: Catalog, host: impl Into<String>, policy: Policy) -> Self {
        Self {
            catalog,
            lookup: Lookup::new(source),
            host: host.into(),
            policy,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The selection as it will actually be composed: unknown slugs removed
    /// (lenient) or rejected (strict), and the category subset canonicalized.
    pub fn normalize(&self, selection: &SelectionState) -> Result<SelectionState, EngineError> {
        let mut normalized = selection.clone();
        self.check(Namespace::Templates, &mut normalized.templates)?;
        self.check(Namespace::Technologies, &mut normalized.technologies)?;
        if let Some(categories) = normalized.categories.as_mut() {
            self.check(Namespace::Categories, categories)?;
        }
        normalized.categories = self.catalog.canonical_categories(&normalized);
        Ok(normalized)
    }

    fn check(&self, namespace: Namespace, slugs: &mut Vec<String>) -> Result<(), EngineError> {
        match self.policy {
            Policy::Strict => {
                let invalid = self.catalog.invalid_slugs(namespace, slugs);
                if !invalid.is_empty() {
                    tracing::warn!(%namespace, ?invalid, "Rejected unknown slugs");
                    return Err(EngineError::InvalidSlugs {
                        namespace,
                        invalid,
                        available: self.catalog.sorted_slugs(namespace),
                    });
                }
            }
            Policy::Lenient => {
                let dropped = self.catalog.retain_known(namespace, slugs);
                if !dropped.is_empty() {
                    tracing::warn!(%namespace, ?dropped, "Ignoring unknown slugs");
                }
            }
        }
        Ok(())
    }

    /// Compose the ignore file for `selection.templates`.
    pub async fn ignore_document(&mut self, selection: &SelectionState) -> Result<ComposedDocument, EngineError> {
        let mut selection = selection.clone();
        self.check(Namespace::Templates, &mut selection.templates)?;

        let keys: Vec<FragmentKey> = selection
            .templates
            .iter()
            .map(|slug| FragmentKey::new(Namespace::Templates, slug.as_str()))
            .collect();
        let results = self.lookup.fetch_many(&keys).await;

        let mut parts = Vec::with_capacity(results.len());
        for (slug, result) in selection.templates.iter().zip(results) {
            match (result, self.policy) {
                (Ok(text), _) => parts.push(text),
                (Err(e), Policy::Strict) => return Err(e.into()),
                (Err(e), Policy::Lenient) => {
                    tracing::warn!(%slug, error = %e, "Template fetch failed");
                    parts.push(format!("# Error loading {} template\n", slug));
                }
            }
        }

        Ok(compose::compose_ignore(&selection, parts, &self.host))
    }

    /// Compose the rules file for the active categories and selected technologies.
    pub async fn rules_document(&mut self, selection: &SelectionState) -> Result<ComposedDocument, EngineError> {
        let mut selection = selection.clone();
        self.check(Namespace::Technologies, &mut selection.technologies)?;
        if let Some(categories) = selection.categories.as_mut() {
            self.check(Namespace::Categories, categories)?;
        }

        let active: Vec<_> = self
            .catalog
            .active_categories(&selection)
            .into_iter()
            .cloned()
            .collect();
        selection.categories = self.catalog.canonical_categories(&selection);

        let keys: Vec<FragmentKey> = active
            .iter()
            .map(|c| FragmentKey::new(Namespace::Categories, c.slug.as_str()))
            .chain(
                selection
                    .technologies
                    .iter()
                    .map(|slug| FragmentKey::new(Namespace::Technologies, slug.as_str())),
            )
            .collect();
        let mut results = self.lookup.fetch_many(&keys).await.into_iter();

        let mut category_texts = Vec::with_capacity(active.len());
        for category in &active {
            let text = match results.next() {
                Some(result) => self.recover(result, Namespace::Categories, &category.slug)?,
                None => String::new(),
            };
            category_texts.push(text);
        }

        let mut technologies = Vec::with_capacity(selection.technologies.len());
        for slug in &selection.technologies {
            let text = match results.next() {
                Some(result) => self.recover(result, Namespace::Technologies, slug)?,
                None => String::new(),
            };
            let name = self
                .catalog
                .technology(slug)
                .map_or_else(|| slug.clone(), |t| t.name.clone());
            technologies.push(TechnologyOverrides {
                name,
                sections: sections::extract(&text),
            });
        }

        let categories: Vec<CategoryRules<'_>> = active
            .iter()
            .zip(&category_texts)
            .map(|(category, text)| CategoryRules {
                category,
                text: text.as_str(),
            })
            .collect();

        Ok(compose::compose_rules(&selection, &categories, &technologies, &self.host))
    }

    /// Guardrail fetch failures are fatal when strict and empty when lenient.
    fn recover(
        &self,
        result: Result<String, RegistryError>,
        namespace: Namespace,
        slug: &str,
    ) -> Result<String, EngineError> {
        match (result, self.policy) {
            (Ok(text), _) => Ok(text),
            (Err(e), Policy::Strict) => Err(e.into()),
            (Err(e), Policy::Lenient) => {
                tracing::warn!(%namespace, %slug, error = %e, "Guardrail fetch failed");
                Ok(String::new())
            }
        }
    }

    /// Installer script writing the ignore file (when templates are selected)
    /// and the rules file (when technologies are selected).
    /// A category subset only applies to the rules file.
    pub async fn installer(&mut self, selection: &SelectionState) -> Result<Rendered, EngineError> {
        let mut selection = selection.clone();
        if selection.technologies.is_empty() {
            selection.categories = None;
        }

        let mut docs = Vec::new();
        if !selection.templates.is_empty() {
            docs.push(self.ignore_document(&selection).await?);
        }
        if !selection.technologies.is_empty() {
            docs.push(self.rules_document(&selection).await?);
        }

        let normalized = self.normalize(&selection)?;
        let command = compose::init_command(&normalized, &self.host);
        let refs: Vec<&ComposedDocument> = docs.iter().collect();
        Ok(render::render_installer(selection.shell, &refs, &command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Format, Shell};
    use crate::registry::MemorySource;

    fn engine(source: MemorySource, policy: Policy) -> Engine {
        tokio_test::block_on(Engine::load(Arc::new(source), Scope::All, "ainit.dev", policy)).unwrap()
    }

    fn slugs(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn strict_rejects_unknown_template_and_lists_available() {
        let mut engine = Engine::load(
            Arc::new(MemorySource::sample()),
            Scope::Templates,
            "ainit.dev",
            Policy::Strict,
        )
        .await
        .unwrap();
        let selection = SelectionState {
            templates: slugs(&["react", "unknownslug"]),
            ..Default::default()
        };

        match engine.ignore_document(&selection).await {
            Err(EngineError::InvalidSlugs {
                namespace,
                invalid,
                available,
            }) => {
                assert_eq!(namespace, Namespace::Templates);
                assert_eq!(invalid, vec!["unknownslug"]);
                assert_eq!(available, vec!["node", "python", "react"]);
            }
            other => panic!("expected InvalidSlugs, got {:?}", other.map(|d| d.text())),
        }
    }

    #[tokio::test]
    async fn lenient_drops_unknown_templates() {
        let mut engine = Engine::load(
            Arc::new(MemorySource::sample()),
            Scope::Templates,
            "ainit.dev",
            Policy::Lenient,
        )
        .await
        .unwrap();
        let selection = SelectionState {
            templates: slugs(&["nope", "node"]),
            ..Default::default()
        };
        let doc = engine.ignore_document(&selection).await.unwrap();
        assert!(doc.header.contains("# Templates: node\n"));
    }

    #[test]
    fn lenient_replaces_failed_template_with_comment() {
        let source = MemorySource::sample().with_failing(Namespace::Templates, "react");
        let mut engine = engine(source, Policy::Lenient);
        let selection = SelectionState {
            templates: slugs(&["react", "node"]),
            ..Default::default()
        };
        let doc = tokio_test::block_on(engine.ignore_document(&selection)).unwrap();
        assert_eq!(doc.blocks[0], "# Error loading react template\n");
        assert!(doc.blocks[1].contains("node_modules/"));
    }

    #[test]
    fn strict_fails_on_fetch_error() {
        let source = MemorySource::sample().with_failing(Namespace::Technologies, "react");
        let mut engine = engine(source, Policy::Strict);
        let selection = SelectionState {
            technologies: slugs(&["react"]),
            ..Default::default()
        };
        let result = tokio_test::block_on(engine.rules_document(&selection));
        assert!(matches!(result, Err(EngineError::Fetch(_))));
    }

    #[test]
    fn rules_merge_in_registry_category_order() {
        let mut engine = engine(MemorySource::sample(), Policy::Strict);
        let selection = SelectionState {
            technologies: slugs(&["node", "react"]),
            ..Default::default()
        };
        let doc = tokio_test::block_on(engine.rules_document(&selection)).unwrap();
        let titles: Vec<&str> = doc.blocks.iter().map(|b| b.lines().next().unwrap()).collect();
        assert_eq!(titles, vec!["# Testing", "# Security", "# Code Style"]);
        assert_eq!(
            doc.blocks[1],
            "# Security\n\n- Never commit secrets\n\n## Node.js\n- Validate all request input\n\n## React\n- Avoid dangerouslySetInnerHTML with user input"
        );
    }

    #[test]
    fn lenient_rules_with_no_valid_categories_is_placeholder() {
        let mut engine = engine(MemorySource::sample(), Policy::Lenient);
        let selection = SelectionState {
            technologies: slugs(&["react"]),
            categories: Some(slugs(&["bogus"])),
            ..Default::default()
        };
        let doc = tokio_test::block_on(engine.rules_document(&selection)).unwrap();
        assert!(!doc.is_enabled());
    }

    #[test]
    fn session_cache_avoids_refetching() {
        let source = Arc::new(MemorySource::sample());
        let catalog = tokio_test::block_on(Catalog::load(source.as_ref(), Scope::All)).unwrap();
        let mut engine = Engine::new(source.clone(), catalog, "ainit.dev", Policy::Lenient);
        let selection = SelectionState {
            templates: slugs(&["python"]),
            ..Default::default()
        };

        tokio_test::block_on(engine.ignore_document(&selection)).unwrap();
        tokio_test::block_on(engine.ignore_document(&selection)).unwrap();
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn installer_writes_both_files() {
        let mut engine = engine(MemorySource::sample(), Policy::Strict);
        let selection = SelectionState {
            templates: slugs(&["node"]),
            technologies: slugs(&["react"]),
            categories: Some(slugs(&["testing"])),
            format: Format::Copilot,
            shell: Shell::Sh,
        };
        let script = tokio_test::block_on(engine.installer(&selection)).unwrap().body;
        assert!(script.contains(
            "# curl -sL \"ainit.dev/api/init?t=node?g=react?c=testing?o=copilot?s=sh\" | sh\n"
        ));
        assert!(script.contains("cat > '.aiexclude' << 'AINIT_IGNORE_EOF'\n"));
        assert!(script.contains("mkdir -p '.github'\n"));
        assert!(script.contains("## React\n- Use React Testing Library\nAINIT_RULES_EOF\n"));
    }
}
