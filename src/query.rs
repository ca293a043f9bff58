//! Selection query codec.
//!
//! Share URLs use a private convention: pairs are separated by a literal `?`,
//! never `&`, so `t=a,b?o=cursor?c=x,y` is three pairs. List values are
//! comma-joined slugs and are never percent-encoded on the way out, which is
//! safe because slugs are restricted to `[a-z0-9-]`.

use std::collections::HashMap;

use crate::models::{push_unique, Format, SelectionState, Shell, Surface};

/// Key injected by some hosting layers. Never user data.
const RESERVED_KEY: &str = "path";

/// Decoding knobs. The default is the canonical contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Undo `%3F` / `%3D` / `%26` before splitting, and also split on `&`.
    ///
    /// Some proxies percent-encode the separators of the raw query. Off unless
    /// a deployment explicitly opts in.
    pub legacy_separators: bool,
}

/// Decoded `key=value` pairs. Unknown keys are kept; later duplicates win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The comma list under `key` as normalized, de-duplicated slugs.
    pub fn slugs(&self, key: &str) -> Vec<String> {
        self.get(key).map(parse_slug_list).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decode with the canonical rule: split on literal `?` only.
pub fn decode(raw: &str) -> QueryParams {
    decode_with(raw, DecodeOptions::default())
}

/// Decode a raw query string (with or without its leading `?`).
///
/// Each value is percent-decoded; a value that does not decode to UTF-8 is kept
/// verbatim. Pairs without `=` and the reserved `path` key are dropped.
pub fn decode_with(raw: &str, options: DecodeOptions) -> QueryParams {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut params = HashMap::new();
    if raw.is_empty() {
        return QueryParams(params);
    }

    let predecoded;
    let pairs: Vec<&str> = if options.legacy_separators {
        predecoded = predecode_separators(raw);
        predecoded.split(['?', '&']).collect()
    } else {
        raw.split('?').collect()
    };

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key == RESERVED_KEY {
            continue;
        }
        let value = match urlencoding::decode(value) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => value.to_string(),
        };
        params.insert(key.to_string(), value);
    }

    QueryParams(params)
}

/// Replace percent-encoded `?`, `=` and `&` (any hex case) with the literal.
fn predecode_separators(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let literal = candidate.get(..3).and_then(|code| {
            match code.to_ascii_uppercase().as_str() {
                "%3F" => Some('?'),
                "%3D" => Some('='),
                "%26" => Some('&'),
                _ => None,
            }
        });
        match literal {
            Some(c) => {
                out.push(c);
                rest = &candidate[3..];
            }
            None => {
                out.push('%');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Split a comma list into trimmed, lowercased slugs, dropping empties and
/// repeats while keeping first-occurrence order.
pub fn parse_slug_list(value: &str) -> Vec<String> {
    let mut slugs = Vec::new();
    for part in value.split(',') {
        push_unique(&mut slugs, part);
    }
    slugs
}

/// Builds a `?`-joined query string.
#[derive(Debug, Default)]
struct QueryBuilder {
    pairs: Vec<String>,
}

impl QueryBuilder {
    fn push(&mut self, key: &str, value: &str) {
        self.pairs.push(format!("{}={}", key, value));
    }

    fn push_list(&mut self, key: &str, values: &[String]) {
        if !values.is_empty() {
            self.push(key, &values.join(","));
        }
    }

    fn finish(self) -> String {
        self.pairs.join("?")
    }
}

impl SelectionState {
    /// Project decoded params onto a selection for the given surface.
    ///
    /// Unknown format or shell values fall back to the defaults. An empty `c=`
    /// means every category is active.
    pub fn from_query(surface: Surface, params: &QueryParams) -> Self {
        let mut selection = SelectionState::default();
        let format = params.get("o").unwrap_or_default();

        match surface {
            Surface::Ignore => {
                selection.templates = params.slugs("t");
                selection.format = Format::from_ignore_slug(format).unwrap_or_default();
            }
            Surface::Guardrails => {
                selection.technologies = params.slugs("t");
                selection.format = Format::from_rules_slug(format).unwrap_or_default();
            }
            Surface::Init => {
                selection.templates = params.slugs("t");
                selection.technologies = params.slugs("g");
                selection.format = Format::from_rules_slug(format).unwrap_or_default();
                selection.shell = params
                    .get("s")
                    .and_then(|s| s.parse::<Shell>().ok())
                    .unwrap_or_default();
            }
        }

        if surface != Surface::Ignore {
            let categories = params.slugs("c");
            if !categories.is_empty() {
                selection.categories = Some(categories);
            }
        }

        selection
    }

    /// Canonical query string for this selection, without the leading `?`.
    pub fn to_query(&self, surface: Surface) -> String {
        let mut query = QueryBuilder::default();

        match surface {
            Surface::Ignore => {
                query.push_list("t", &self.templates);
                query.push("o", self.format.ignore_slug());
            }
            Surface::Guardrails => {
                query.push_list("t", &self.technologies);
                self.push_categories(&mut query);
                query.push("o", self.format.rules_slug());
            }
            Surface::Init => {
                query.push_list("t", &self.templates);
                query.push_list("g", &self.technologies);
                self.push_categories(&mut query);
                query.push("o", self.format.rules_slug());
                query.push("s", self.shell.slug());
            }
        }

        query.finish()
    }

    fn push_categories(&self, query: &mut QueryBuilder) {
        if let Some(categories) = &self.categories {
            query.push("c", &categories.join(","));
        }
    }
}
