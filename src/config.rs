//! Runtime settings.
//!
//! Configuration is via environment variables:
//! - `AINIT_DATA_DIR` - Registry directory (default: `./public`, else the platform data dir)
//! - `AINIT_UPSTREAM_URL` - Fetch the registry over HTTP from this origin instead
//! - `AINIT_PUBLIC_HOST` - Host echoed in generated commands (default: `ainit.dev`)
//! - `AINIT_LEGACY_SEPARATORS` - Accept percent-encoded `?`/`=`/`&` separators

use std::path::PathBuf;
use std::sync::Arc;

use crate::query::DecodeOptions;
use crate::registry::{DirSource, FragmentSource, HttpSource};

pub const DEFAULT_HOST: &str = "ainit.dev";
const LOCAL_DATA_DIR: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub upstream_url: Option<String>,
    pub public_host: String,
    pub legacy_separators: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            upstream_url: None,
            public_host: DEFAULT_HOST.to_string(),
            legacy_separators: false,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            data_dir: non_empty("AINIT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            upstream_url: non_empty("AINIT_UPSTREAM_URL"),
            public_host: non_empty("AINIT_PUBLIC_HOST").unwrap_or(defaults.public_host),
            legacy_separators: non_empty("AINIT_LEGACY_SEPARATORS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            legacy_separators: self.legacy_separators,
        }
    }

    /// The registry these settings point at. An upstream URL wins over the directory.
    pub fn source(&self) -> Arc<dyn FragmentSource> {
        match &self.upstream_url {
            Some(url) => {
                tracing::debug!(%url, "Using upstream registry");
                Arc::new(HttpSource::new(url.clone()))
            }
            None => {
                tracing::debug!(dir = %self.data_dir.display(), "Using registry directory");
                Arc::new(DirSource::new(self.data_dir.clone()))
            }
        }
    }
}

fn default_data_dir() -> PathBuf {
    let local = PathBuf::from(LOCAL_DATA_DIR);
    if local.is_dir() {
        return local;
    }
    directories::ProjectDirs::from("dev", "ainit", "ainit")
        .map(|dirs| dirs.data_dir().join("registry"))
        .unwrap_or(local)
}
