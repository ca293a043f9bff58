//! Fragment registries and retrieval.
//!
//! The engine never reads storage directly. It asks a [`FragmentSource`] for the
//! registry indexes and for fragment text by `(namespace, slug)`, validates
//! slugs against the loaded [`Catalog`], and caches fetched text per session in
//! a [`Lookup`].

mod dir;
mod http;
mod memory;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;

use crate::models::{Category, Fragment, GuardrailsIndex, SelectionState, Technology};

pub use dir::DirSource;
pub use http::HttpSource;
pub use memory::MemorySource;

/// Registry listing ignore templates.
pub const TEMPLATE_INDEX: &str = "templates/index.json";
/// Registry listing guardrail categories and technologies.
pub const GUARDRAILS_INDEX: &str = "guardrails/index.json";

/// Interactive search shows at most this many results.
const SEARCH_LIMIT: usize = 12;

/// Independent slug namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Templates,
    Categories,
    Technologies,
}

impl Namespace {
    /// Storage path of a fragment, relative to the registry root.
    pub fn fragment_path(self, slug: &str) -> String {
        match self {
            Namespace::Templates => format!("templates/{}.txt", slug),
            Namespace::Categories => format!("guardrails/categories/{}.md", slug),
            Namespace::Technologies => format!("guardrails/tech/{}.md", slug),
        }
    }

    /// Plural-tolerant label used in error bodies, e.g. `Unknown template(s)`.
    pub fn label(self) -> &'static str {
        match self {
            Namespace::Templates => "template(s)",
            Namespace::Categories => "category(ies)",
            Namespace::Technologies => "technology(ies)",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Namespace::Templates => "template",
            Namespace::Categories => "category",
            Namespace::Technologies => "technology",
        })
    }
}

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{namespace} '{slug}' not found")]
    NotFound { namespace: Namespace, slug: String },

    #[error("Invalid slug: {0:?}")]
    InvalidSlug(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status} for {url}")]
    Upstream { status: u16, url: String },

    #[error("Failed to parse {path}: {source}")]
    Index {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read access to the static registries.
///
/// Implementations must be safe to call concurrently; the engine issues all
/// fetches for one document at once.
#[async_trait]
pub trait FragmentSource: Send + Sync {
    async fn template_index(&self) -> Result<Vec<Fragment>, RegistryError>;

    async fn guardrails_index(&self) -> Result<GuardrailsIndex, RegistryError>;

    /// Raw fragment text. Fails with [`RegistryError::NotFound`] for unknown slugs.
    async fn fetch_fragment(&self, namespace: Namespace, slug: &str) -> Result<String, RegistryError>;
}

pub(crate) fn parse_index<T: serde::de::DeserializeOwned>(
    path: &str,
    text: &str,
) -> Result<T, RegistryError> {
    serde_json::from_str(text).map_err(|source| RegistryError::Index {
        path: path.to_string(),
        source,
    })
}

/// Which registry indexes a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Templates,
    Guardrails,
    All,
}

impl Scope {
    fn templates(self) -> bool {
        matches!(self, Scope::Templates | Scope::All)
    }

    fn guardrails(self) -> bool {
        matches!(self, Scope::Guardrails | Scope::All)
    }
}

/// Loaded registry indexes. Lists keep registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub templates: Vec<Fragment>,
    pub guardrails: GuardrailsIndex,
}

impl Catalog {
    /// Load the indexes `scope` asks for. Indexes outside the scope stay empty.
    pub async fn load(source: &dyn FragmentSource, scope: Scope) -> Result<Self, RegistryError> {
        let templates = async {
            if scope.templates() {
                source.template_index().await
            } else {
                Ok(Vec::new())
            }
        };
        let guardrails = async {
            if scope.guardrails() {
                source.guardrails_index().await
            } else {
                Ok(GuardrailsIndex::default())
            }
        };
        let (templates, guardrails) = futures::try_join!(templates, guardrails)?;

        tracing::debug!(
            templates = templates.len(),
            categories = guardrails.categories.len(),
            technologies = guardrails.technologies.len(),
            "Loaded catalog"
        );

        Ok(Self {
            templates,
            guardrails,
        })
    }

    /// Slugs of a namespace in registry order.
    pub fn slugs(&self, namespace: Namespace) -> Vec<&str> {
        match namespace {
            Namespace::Templates => self.templates.iter().map(|t| t.slug.as_str()).collect(),
            Namespace::Categories => self
                .guardrails
                .categories
                .iter()
                .map(|c| c.slug.as_str())
                .collect(),
            Namespace::Technologies => self
                .guardrails
                .technologies
                .iter()
                .map(|t| t.slug.as_str())
                .collect(),
        }
    }

    /// Slugs of a namespace, sorted, for "Available: ..." listings.
    pub fn sorted_slugs(&self, namespace: Namespace) -> Vec<String> {
        let mut slugs: Vec<String> = self
            .slugs(namespace)
            .into_iter()
            .map(str::to_string)
            .collect();
        slugs.sort();
        slugs
    }

    pub fn is_valid_slug(&self, namespace: Namespace, slug: &str) -> bool {
        self.slugs(namespace).contains(&slug)
    }

    /// The requested slugs that are not in the registry, in request order.
    pub fn invalid_slugs(&self, namespace: Namespace, slugs: &[String]) -> Vec<String> {
        slugs
            .iter()
            .filter(|s| !self.is_valid_slug(namespace, s))
            .cloned()
            .collect()
    }

    /// Drop unknown slugs in place, returning the dropped ones.
    pub fn retain_known(&self, namespace: Namespace, slugs: &mut Vec<String>) -> Vec<String> {
        let dropped = self.invalid_slugs(namespace, slugs);
        slugs.retain(|s| self.is_valid_slug(namespace, s));
        dropped
    }

    pub fn template(&self, slug: &str) -> Option<&Fragment> {
        self.templates.iter().find(|t| t.slug == slug)
    }

    pub fn technology(&self, slug: &str) -> Option<&Technology> {
        self.guardrails.technologies.iter().find(|t| t.slug == slug)
    }

    /// Categories active in `selection`, in registry order.
    pub fn active_categories(&self, selection: &SelectionState) -> Vec<&Category> {
        self.guardrails
            .categories
            .iter()
            .filter(|c| selection.category_active(&c.slug))
            .collect()
    }

    /// Canonical form of a category subset: registry order, and `None` when it
    /// covers every category.
    pub fn canonical_categories(&self, selection: &SelectionState) -> Option<Vec<String>> {
        selection.categories.as_ref()?;
        let active = self.active_categories(selection);
        if active.len() == self.guardrails.categories.len() {
            None
        } else {
            Some(active.into_iter().map(|c| c.slug.clone()).collect())
        }
    }

    /// Interactive search over a namespace, skipping already selected slugs.
    pub fn search(&self, namespace: Namespace, query: &str, selected: &[String]) -> Vec<&Fragment> {
        let (entries, include_category) = match namespace {
            Namespace::Templates => (&self.templates, true),
            Namespace::Technologies => (&self.guardrails.technologies, false),
            Namespace::Categories => return Vec::new(),
        };
        entries
            .iter()
            .filter(|e| !selected.contains(&e.slug) && e.matches(query, include_category))
            .take(SEARCH_LIMIT)
            .collect()
    }
}

/// A fragment address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub namespace: Namespace,
    pub slug: String,
}

impl FragmentKey {
    pub fn new(namespace: Namespace, slug: impl Into<String>) -> Self {
        Self {
            namespace,
            slug: slug.into(),
        }
    }
}

/// Session-scoped fragment cache in front of a [`FragmentSource`].
///
/// Fragment text is immutable for the process lifetime, so entries never expire.
/// Failed fetches are not cached.
pub struct Lookup {
    source: Arc<dyn FragmentSource>,
    cache: HashMap<FragmentKey, String>,
}

impl Lookup {
    pub fn new(source: Arc<dyn FragmentSource>) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    pub fn source(&self) -> &dyn FragmentSource {
        self.source.as_ref()
    }

    /// Number of cached fragments.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Fetch every key, concurrently for the uncached ones.
    ///
    /// Results line up with `keys` whatever order the fetches complete in.
    pub async fn fetch_many(&mut self, keys: &[FragmentKey]) -> Vec<Result<String, RegistryError>> {
        let mut missing: Vec<&FragmentKey> = Vec::new();
        for key in keys {
            if !self.cache.contains_key(key) && !missing.contains(&key) {
                missing.push(key);
            }
        }

        tracing::debug!(
            requested = keys.len(),
            fetching = missing.len(),
            "Fetching fragments"
        );

        let source = Arc::clone(&self.source);
        let fetched = join_all(
            missing
                .iter()
                .map(|key| source.fetch_fragment(key.namespace, &key.slug)),
        )
        .await;

        let mut failures: HashMap<&FragmentKey, RegistryError> = HashMap::new();
        for (key, result) in missing.into_iter().zip(fetched) {
            match result {
                Ok(text) => {
                    self.cache.insert(key.clone(), text);
                }
                Err(e) => {
                    failures.insert(key, e);
                }
            }
        }

        keys.iter()
            .map(|key| match self.cache.get(key) {
                Some(text) => Ok(text.clone()),
                None => Err(failures.remove(key).unwrap_or_else(|| RegistryError::NotFound {
                    namespace: key.namespace,
                    slug: key.slug.clone(),
                })),
            })
            .collect()
    }
}
