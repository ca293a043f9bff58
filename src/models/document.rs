/// Content type of every generated document and script.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Which composition path produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Ignore,
    Rules,
}

/// The engine's output: a generated header plus ordered text blocks, bound for
/// one target file. Regenerated on every selection change, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    pub kind: DocumentKind,
    /// Target path relative to the project root.
    pub filename: String,
    pub content_type: &'static str,
    /// Comment block naming the format, selection and retrieval command.
    pub header: String,
    pub blocks: Vec<String>,
    /// Set when there is nothing to compose. A placeholder document has output
    /// disabled: it must not be copied, downloaded or written to disk.
    pub placeholder: Option<String>,
}

impl ComposedDocument {
    pub fn new(kind: DocumentKind, filename: impl Into<String>, header: String, blocks: Vec<String>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            content_type: TEXT_PLAIN,
            header,
            blocks,
            placeholder: None,
        }
    }

    pub fn placeholder(kind: DocumentKind, filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            content_type: TEXT_PLAIN,
            header: String::new(),
            blocks: Vec::new(),
            placeholder: Some(message.into()),
        }
    }

    /// False for placeholder documents.
    pub fn is_enabled(&self) -> bool {
        self.placeholder.is_none()
    }

    /// Full document text, header first, separated from the body by a blank line.
    ///
    /// Ignore blocks each end in a newline and are joined by one more, rules
    /// blocks are trimmed and joined by a blank line.
    pub fn text(&self) -> String {
        if let Some(message) = &self.placeholder {
            return format!("{}\n", message);
        }

        let mut out = self.header.clone();
        out.push('\n');
        match self.kind {
            DocumentKind::Ignore => out.push_str(&self.blocks.join("\n")),
            DocumentKind::Rules => {
                out.push_str(&self.blocks.join("\n\n"));
                out.push('\n');
            }
        }
        out
    }
}
