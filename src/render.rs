//! Rendering composed documents to their delivered form.
//!
//! A document is either delivered as-is ([`render_text`]) or wrapped in an
//! installer script that writes it to disk ([`render_installer`]). Scripts are
//! meant to be piped straight into `sh` or evaluated by PowerShell, so every
//! piece of embedded text goes through a quoting function for its dialect.

use crate::models::{ComposedDocument, DocumentKind, Shell, TEXT_PLAIN};

/// Bytes ready to send or save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Deliver a document directly. The header is already part of its text.
pub fn render_text(doc: &ComposedDocument) -> Rendered {
    Rendered {
        filename: doc.filename.clone(),
        content_type: doc.content_type,
        body: doc.text(),
    }
}

/// Wrap documents in a script that writes each one to its target file.
///
/// Placeholder and empty documents are skipped. `command` is echoed in a
/// leading comment so the script names how it was produced.
pub fn render_installer(shell: Shell, docs: &[&ComposedDocument], command: &str) -> Rendered {
    let mut script = match shell {
        Shell::Sh => format!("#!/bin/sh\n# {}\n", command),
        Shell::Ps => format!("# {}\n$u = [Text.UTF8Encoding]::new($false)\n", command),
    };

    for doc in docs.iter().filter(|d| d.is_enabled()) {
        let content = with_single_trailing_newline(&doc.text());
        if content.trim().is_empty() {
            continue;
        }
        match shell {
            Shell::Sh => write_sh(&mut script, doc, &content),
            Shell::Ps => write_ps(&mut script, doc, &content),
        }
    }

    Rendered {
        filename: match shell {
            Shell::Sh => "ainit.sh".to_string(),
            Shell::Ps => "ainit.ps1".to_string(),
        },
        content_type: TEXT_PLAIN,
        body: script,
    }
}

fn write_sh(script: &mut String, doc: &ComposedDocument, content: &str) {
    let path = sh_single_quote(&doc.filename);
    if let Some(dir) = parent_dir(&doc.filename) {
        script.push_str(&format!("mkdir -p {}\n", sh_single_quote(dir)));
    }
    let marker = heredoc_marker(marker_base(doc.kind), content);
    script.push_str(&format!("cat > {} << '{}'\n", path, marker));
    script.push_str(content);
    script.push_str(&marker);
    script.push('\n');
    script.push_str(&format!(
        "echo {}\n",
        sh_single_quote(&format!("Created {}", doc.filename))
    ));
}

fn write_ps(script: &mut String, doc: &ComposedDocument, content: &str) {
    if let Some(dir) = parent_dir(&doc.filename) {
        script.push_str(&format!(
            "New-Item -ItemType Directory -Force -Path (Join-Path $PWD {}) | Out-Null\n",
            ps_single_quote(dir)
        ));
    }
    script.push_str(&format!(
        "[IO.File]::WriteAllText((Join-Path $PWD {}), {}, $u)\n",
        ps_single_quote(&doc.filename),
        ps_single_quote(content)
    ));
    script.push_str(&format!(
        "Write-Host {}\n",
        ps_single_quote(&format!("Created {}", doc.filename))
    ));
}

fn marker_base(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Ignore => "AINIT_IGNORE_EOF",
        DocumentKind::Rules => "AINIT_RULES_EOF",
    }
}

/// A heredoc delimiter that no line of `content` equals.
///
/// Starts from `base` and appends `_1`, `_2`, ... until it is free.
pub fn heredoc_marker(base: &str, content: &str) -> String {
    let mut marker = base.to_string();
    let mut n = 0;
    while content.lines().any(|line| line == marker) {
        n += 1;
        marker = format!("{}_{}", base, n);
    }
    marker
}

/// POSIX single-quoted literal. `'` becomes `'\''`.
pub fn sh_single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// PowerShell single-quoted literal.
///
/// PowerShell treats the typographic quotes U+2018..U+201B like `'`, so each
/// of them is doubled as well.
pub fn ps_single_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            out.push(c);
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Directory component of a relative path, if any.
fn parent_dir(path: &str) -> Option<&str> {
    path.rfind('/').map(|i| &path[..i]).filter(|d| !d.is_empty())
}

fn with_single_trailing_newline(text: &str) -> String {
    let mut out = text.trim_end_matches(['\n', '\r']).to_string();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(kind: DocumentKind, filename: &str, body: &str) -> ComposedDocument {
        ComposedDocument::new(kind, filename, "# header\n".to_string(), vec![body.to_string()])
    }

    #[test]
    fn text_rendering_keeps_filename_and_content_type() {
        let d = doc(DocumentKind::Ignore, ".aiignore", "dist/\n");
        let rendered = render_text(&d);
        assert_eq!(rendered.filename, ".aiignore");
        assert_eq!(rendered.content_type, "text/plain; charset=utf-8");
        assert_eq!(rendered.body, "# header\n\ndist/\n");
    }

    #[test]
    fn sh_installer_creates_dotfolder_before_heredoc() {
        let rules = doc(DocumentKind::Rules, ".github/copilot-instructions.md", "# Testing");
        let script = render_installer(Shell::Sh, &[&rules], "cmd").body;

        let mkdir = script.find("mkdir -p '.github'\n").unwrap();
        let cat = script
            .find("cat > '.github/copilot-instructions.md' << 'AINIT_RULES_EOF'\n")
            .unwrap();
        assert!(mkdir < cat);
        assert!(script.ends_with("AINIT_RULES_EOF\necho 'Created .github/copilot-instructions.md'\n"));
    }

    #[test]
    fn sh_heredoc_content_ends_with_exactly_one_newline() {
        for body in ["node_modules/", "node_modules/\n", "node_modules/\n\n\n"] {
            let ignore = doc(DocumentKind::Ignore, ".aiignore", body);
            let script = render_installer(Shell::Sh, &[&ignore], "cmd").body;
            assert!(
                script.contains("node_modules/\nAINIT_IGNORE_EOF\n"),
                "body {:?} rendered as {:?}",
                body,
                script
            );
            assert!(!script.contains("node_modules/\n\nAINIT_IGNORE_EOF"));
        }
    }

    #[test]
    fn sh_installer_writes_ignore_then_rules() {
        let ignore = doc(DocumentKind::Ignore, ".cursorignore", "dist/\n");
        let rules = doc(DocumentKind::Rules, ".cursorrules", "# Testing");
        let script = render_installer(Shell::Sh, &[&ignore, &rules], "cmd").body;
        assert!(script.starts_with("#!/bin/sh\n# cmd\ncat > '.cursorignore'"));
        assert!(script.find(".cursorignore").unwrap() < script.find(".cursorrules").unwrap());
        assert!(!script.contains("mkdir"));
    }

    #[test]
    fn installer_skips_placeholders() {
        let placeholder = ComposedDocument::placeholder(DocumentKind::Ignore, ".aiignore", "# none");
        let script = render_installer(Shell::Sh, &[&placeholder], "cmd").body;
        assert_eq!(script, "#!/bin/sh\n# cmd\n");
    }

    #[test]
    fn heredoc_marker_avoids_collisions() {
        assert_eq!(heredoc_marker("EOF", "a\nb\n"), "EOF");
        assert_eq!(heredoc_marker("EOF", "a\nEOF\nEOF_1\n"), "EOF_2");
        assert_eq!(heredoc_marker("EOF", "  EOF\n"), "EOF");
    }

    #[test]
    fn sh_installer_uses_free_marker_when_content_contains_default() {
        let ignore = doc(DocumentKind::Ignore, ".aiignore", "AINIT_IGNORE_EOF\n");
        let script = render_installer(Shell::Sh, &[&ignore], "cmd").body;
        assert!(script.contains("<< 'AINIT_IGNORE_EOF_1'\n"));
        assert!(script.contains("AINIT_IGNORE_EOF\nAINIT_IGNORE_EOF_1\n"));
    }

    #[test]
    fn sh_quote_escapes_single_quotes() {
        assert_eq!(sh_single_quote("plain"), "'plain'");
        assert_eq!(sh_single_quote("it's"), r"'it'\''s'");
        assert_eq!(sh_single_quote("$HOME `x` \"y\""), "'$HOME `x` \"y\"'");
    }

    #[test]
    fn ps_quote_doubles_every_single_quote_form() {
        assert_eq!(ps_single_quote("it's"), "'it''s'");
        assert_eq!(ps_single_quote("don\u{2019}t"), "'don\u{2019}\u{2019}t'");
        assert_eq!(ps_single_quote("$env:PATH"), "'$env:PATH'");
    }

    #[test]
    fn ps_installer_writes_bomless_utf8_and_creates_directory() {
        let rules = doc(
            DocumentKind::Rules,
            ".github/copilot-instructions.md",
            "- Don't log secrets",
        );
        let script = render_installer(Shell::Ps, &[&rules], "cmd").body;
        assert!(script.starts_with("# cmd\n$u = [Text.UTF8Encoding]::new($false)\n"));
        assert!(script.contains(
            "New-Item -ItemType Directory -Force -Path (Join-Path $PWD '.github') | Out-Null\n"
        ));
        assert!(script.contains(
            "[IO.File]::WriteAllText((Join-Path $PWD '.github/copilot-instructions.md'), '# header\n\n- Don''t log secrets\n', $u)\n"
        ));
        assert!(script.ends_with("Write-Host 'Created .github/copilot-instructions.md'\n"));
        assert_eq!(render_installer(Shell::Ps, &[], "cmd").filename, "ainit.ps1");
    }

    #[test]
    fn parent_dir_only_for_nested_paths() {
        assert_eq!(parent_dir(".github/copilot-instructions.md"), Some(".github"));
        assert_eq!(parent_dir("AGENTS.md"), None);
        assert_eq!(parent_dir("/root"), None);
    }
}
