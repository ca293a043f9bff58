use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The target AI tool. Each tool has one ignore-file convention and one
/// rules-file convention, addressed by separate slugs in share URLs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Cross-tool AGENTS.md / .aiignore
    #[default]
    Agents,
    Cursor,
    Claude,
    Windsurf,
    Copilot,
    Gemini,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Agents,
        Format::Cursor,
        Format::Claude,
        Format::Windsurf,
        Format::Copilot,
        Format::Gemini,
    ];

    /// File written for the ignore-list path.
    pub fn ignore_file(self) -> &'static str {
        match self {
            Format::Agents => ".aiignore",
            Format::Cursor => ".cursorignore",
            Format::Claude => ".claudeignore",
            Format::Windsurf => ".codeiumignore",
            Format::Copilot => ".aiexclude",
            Format::Gemini => ".geminiignore",
        }
    }

    /// File written for the rules path. May carry a directory component.
    pub fn rules_file(self) -> &'static str {
        match self {
            Format::Agents => "AGENTS.md",
            Format::Cursor => ".cursorrules",
            Format::Claude => "CLAUDE.md",
            Format::Windsurf => ".windsurfrules",
            Format::Copilot => ".github/copilot-instructions.md",
            Format::Gemini => "GEMINI.md",
        }
    }

    /// `o=` value on the ignore path.
    pub fn ignore_slug(self) -> &'static str {
        self.ignore_file().trim_start_matches('.')
    }

    /// `o=` value on the guardrails and installer paths.
    pub fn rules_slug(self) -> &'static str {
        match self {
            Format::Agents => "agents",
            Format::Cursor => "cursor",
            Format::Claude => "claude",
            Format::Windsurf => "windsurf",
            Format::Copilot => "copilot",
            Format::Gemini => "gemini",
        }
    }

    pub fn tool_name(self) -> &'static str {
        match self {
            Format::Agents => "Cross-tool (Linux Foundation)",
            Format::Cursor => "Cursor",
            Format::Claude => "Claude Code",
            Format::Windsurf => "Windsurf",
            Format::Copilot => "GitHub Copilot",
            Format::Gemini => "Gemini Code Assist",
        }
    }

    /// Where to put the generated files for this tool.
    pub fn setup_hint(self) -> &'static str {
        match self {
            Format::Agents => {
                "Drop AGENTS.md in your project root. No tool reads .aiignore natively yet; rename it for your tool."
            }
            Format::Cursor => {
                "Drop .cursorignore and .cursorrules in your project root. Cursor reads both automatically."
            }
            Format::Claude => {
                "Drop .claudeignore and CLAUDE.md in your project root. Claude Code reads both automatically."
            }
            Format::Windsurf => {
                "Drop .codeiumignore and .windsurfrules in your project root. Windsurf reads both automatically."
            }
            Format::Copilot => {
                "Drop .aiexclude in your project root and copilot-instructions.md in .github/."
            }
            Format::Gemini => {
                "Drop .geminiignore and GEMINI.md in your project root. GEMINI.md takes precedence over AGENTS.md."
            }
        }
    }

    pub fn from_ignore_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.ignore_slug() == slug)
    }

    pub fn from_rules_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.rules_slug() == slug)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rules_slug())
    }
}

/// Interpreter an installer script is written for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    /// POSIX sh
    #[default]
    Sh,
    /// PowerShell
    Ps,
}

impl Shell {
    pub fn slug(self) -> &'static str {
        match self {
            Shell::Sh => "sh",
            Shell::Ps => "ps",
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Shell {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sh" => Ok(Shell::Sh),
            "ps" => Ok(Shell::Ps),
            other => Err(format!("unknown shell: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_slugs_drop_the_leading_dot() {
        assert_eq!(Format::Copilot.ignore_slug(), "aiexclude");
        assert_eq!(Format::Windsurf.ignore_slug(), "codeiumignore");
    }

    #[test]
    fn slug_families_resolve_independently() {
        assert_eq!(Format::from_ignore_slug("cursorignore"), Some(Format::Cursor));
        assert_eq!(Format::from_rules_slug("cursor"), Some(Format::Cursor));
        assert_eq!(Format::from_ignore_slug("cursor"), None);
        assert_eq!(Format::from_rules_slug("cursorignore"), None);
    }

    #[test]
    fn slug_lookup_normalizes_case() {
        assert_eq!(Format::from_rules_slug(" Gemini "), Some(Format::Gemini));
    }

    #[test]
    fn copilot_rules_live_in_dotfolder() {
        assert_eq!(Format::Copilot.rules_file(), ".github/copilot-instructions.md");
    }

    #[test]
    fn shell_parses_known_values_only() {
        assert_eq!("PS".parse::<Shell>(), Ok(Shell::Ps));
        assert!("bash".parse::<Shell>().is_err());
    }
}
