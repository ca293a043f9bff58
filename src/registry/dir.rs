use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{parse_index, FragmentSource, Namespace, RegistryError, GUARDRAILS_INDEX, TEMPLATE_INDEX};
use crate::models::{is_slug_syntax, Fragment, GuardrailsIndex};

/// Registry served from a directory laid out like the static site:
///
/// ```text
/// <root>/templates/index.json
/// <root>/templates/<slug>.txt
/// <root>/guardrails/index.json
/// <root>/guardrails/categories/<slug>.md
/// <root>/guardrails/tech/<slug>.md
/// ```
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, relative: &str) -> Result<String, std::io::Error> {
        tokio::fs::read_to_string(self.root.join(relative)).await
    }

    async fn read_index(&self, relative: &str) -> Result<String, RegistryError> {
        self.read(relative).await.map_err(|source| RegistryError::Io {
            path: self.root.join(relative),
            source,
        })
    }
}

#[async_trait]
impl FragmentSource for DirSource {
    async fn template_index(&self) -> Result<Vec<Fragment>, RegistryError> {
        let text = self.read_index(TEMPLATE_INDEX).await?;
        parse_index(TEMPLATE_INDEX, &text)
    }

    async fn guardrails_index(&self) -> Result<GuardrailsIndex, RegistryError> {
        let text = self.read_index(GUARDRAILS_INDEX).await?;
        parse_index(GUARDRAILS_INDEX, &text)
    }

    async fn fetch_fragment(&self, namespace: Namespace, slug: &str) -> Result<String, RegistryError> {
        if !is_slug_syntax(slug) {
            return Err(RegistryError::InvalidSlug(slug.to_string()));
        }

        let relative = namespace.fragment_path(slug);
        match self.read(&relative).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RegistryError::NotFound {
                namespace,
                slug: slug.to_string(),
            }),
            Err(source) => Err(RegistryError::Io {
                path: self.root.join(relative),
                source,
            }),
        }
    }
}
