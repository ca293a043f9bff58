//! Registry fetched over HTTP from a deployed static site.
//!
//! Configuration is via `AINIT_UPSTREAM_URL` (see [`crate::config::Settings`]).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{parse_index, FragmentSource, Namespace, RegistryError, GUARDRAILS_INDEX, TEMPLATE_INDEX};
use crate::models::{is_slug_syntax, Fragment, GuardrailsIndex};

/// HTTP client for a static registry origin, e.g. `https://ainit.dev`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, relative)
    }

    /// GET a path, converting non-success statuses to errors.
    async fn get_text(&self, relative: &str) -> Result<Result<String, StatusCode>, RegistryError> {
        let response = self.client.get(self.url(relative)).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(Ok(response.text().await?))
        } else {
            Ok(Err(status))
        }
    }

    async fn get_index(&self, relative: &str) -> Result<String, RegistryError> {
        self.get_text(relative)
            .await?
            .map_err(|status| RegistryError::Upstream {
                status: status.as_u16(),
                url: self.url(relative),
            })
    }
}

#[async_trait]
impl FragmentSource for HttpSource {
    async fn template_index(&self) -> Result<Vec<Fragment>, RegistryError> {
        let text = self.get_index(TEMPLATE_INDEX).await?;
        parse_index(TEMPLATE_INDEX, &text)
    }

    async fn guardrails_index(&self) -> Result<GuardrailsIndex, RegistryError> {
        let text = self.get_index(GUARDRAILS_INDEX).await?;
        parse_index(GUARDRAILS_INDEX, &text)
    }

    async fn fetch_fragment(&self, namespace: Namespace, slug: &str) -> Result<String, RegistryError> {
        if !is_slug_syntax(slug) {
            return Err(RegistryError::InvalidSlug(slug.to_string()));
        }

        let relative = namespace.fragment_path(slug);
        match self.get_text(&relative).await? {
            Ok(text) => Ok(text),
            Err(StatusCode::NOT_FOUND) => Err(RegistryError::NotFound {
                namespace,
                slug: slug.to_string(),
            }),
            Err(status) => Err(RegistryError::Upstream {
                status: status.as_u16(),
                url: self.url(&relative),
            }),
        }
    }
}
