use std::sync::Arc;

use ainit::api::{create_router, AppState};
use ainit::config::Settings;
use ainit::models::{Fragment, GuardrailsIndex};
use ainit::registry::{MemorySource, Namespace};
use axum::http::StatusCode;
use axum_test::TestServer;

fn settings() -> Settings {
    Settings {
        public_host: "ainit.dev".to_string(),
        ..Settings::default()
    }
}

fn server_with(source: MemorySource, settings: Settings) -> TestServer {
    let state = AppState::new(Arc::new(source), &settings);
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

fn setup() -> TestServer {
    server_with(MemorySource::sample(), settings())
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();
        let response = server.get("/health").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
    }
}

mod ignore_files {
    use super::*;

    #[tokio::test]
    async fn concatenates_templates_in_request_order() {
        let server = setup();
        let response = server.get("/api/react,node").await;

        response.assert_status_ok();
        assert_eq!(
            response.text(),
            "# === .aiignore ===\n\
             # Templates: react, node\n\
             # curl -L ainit.dev/api/react,node?o=aiignore\n\
             \n\
             # React\nbuild/\ncoverage/\n\
             \n\
             # Node\nnode_modules/\n.env\n"
        );
    }

    #[tokio::test]
    async fn serves_plain_text_utf8() {
        let server = setup();
        let response = server.get("/api/python").await;
        response.assert_status_ok();
        assert_eq!(
            response.header("content-type"),
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn output_format_selects_the_target_file() {
        let server = setup();
        let response = server.get("/api/python?o=cursorignore").await;
        response.assert_status_ok();
        let text = response.text();
        assert!(text.starts_with("# === .cursorignore ===\n"));
        assert!(text.contains("# curl -L ainit.dev/api/python?o=cursorignore\n"));
        assert!(text.contains("__pycache__/"));
    }

    #[tokio::test]
    async fn unknown_format_falls_back_to_aiignore() {
        let server = setup();
        let response = server.get("/api/python?o=vimignore").await;
        response.assert_status_ok();
        assert!(response.text().starts_with("# === .aiignore ===\n"));
    }

    #[tokio::test]
    async fn slugs_are_normalized_and_deduplicated() {
        let server = setup();
        let response = server.get("/api/%20React%20,node,react").await;
        response.assert_status_ok();
        assert!(response.text().contains("# Templates: react, node\n"));
    }

    #[tokio::test]
    async fn unknown_slug_is_404_naming_only_the_unknown_one() {
        let server = setup();
        let response = server.get("/api/react,unknownslug").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let text = response.text();
        assert!(text.starts_with("Unknown template(s): unknownslug\n"));
        assert!(text.contains("Available: node, python, react\n"));
        assert!(!text.contains("Unknown template(s): react"));
    }

    #[tokio::test]
    async fn upstream_failure_is_502_without_internal_details() {
        let source = MemorySource::sample().with_failing(Namespace::Templates, "react");
        let server = server_with(source, settings());
        let response = server.get("/api/react").await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(!response.text().contains("templates/react.txt"));
    }

    #[tokio::test]
    async fn bare_api_path_returns_usage() {
        let server = setup();
        for path in ["/api", "/api/"] {
            let response = server.get(path).await;
            response.assert_status_ok();
            assert!(response
                .text()
                .starts_with("Usage: curl -L ainit.dev/api/react,node,typescript\n"));
        }
    }

    #[tokio::test]
    async fn usage_echoes_configured_host() {
        let server = server_with(
            MemorySource::sample(),
            Settings {
                public_host: "init.example.com".to_string(),
                ..Settings::default()
            },
        );
        let response = server.get("/api").await;
        assert!(response.text().contains("See https://init.example.com for"));
    }

    #[tokio::test]
    async fn lists_templates_as_json() {
        let server = setup();
        let response = server.get("/api/templates").await;
        response.assert_status_ok();
        let templates: Vec<Fragment> = response.json();
        let slugs: Vec<&str> = templates.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["python", "node", "react"]);
    }
}

mod guardrails {
    use super::*;

    #[tokio::test]
    async fn merges_technology_sections_under_categories() {
        let server = setup();
        let response = server.get("/api/guardrails/react?c=security?o=cursor").await;

        response.assert_status_ok();
        assert_eq!(
            response.text(),
            "# === .cursorrules ===\n\
             # Generated by ainit.dev/guardrails\n\
             # Categories: security\n\
             # Technologies: react\n\
             # curl -L ainit.dev/api/guardrails/react?c=security?o=cursor\n\
             \n\
             # Security\n\
             \n\
             - Never commit secrets\n\
             \n\
             ## React\n\
             - Avoid dangerouslySetInnerHTML with user input\n"
        );
    }

    #[tokio::test]
    async fn all_categories_by_default_in_registry_order() {
        let server = setup();
        let response = server.get("/api/guardrails/react,node").await;

        response.assert_status_ok();
        let text = response.text();
        assert!(text.starts_with("# === AGENTS.md ===\n"));
        assert!(!text.contains("# Categories:"));

        let testing = text.find("# Testing").unwrap();
        let security = text.find("# Security").unwrap();
        let style = text.find("# Code Style").unwrap();
        assert!(testing < security && security < style);

        // Technologies keep selection order inside a category
        let react = text.find("## React\n- Avoid").unwrap();
        let node = text.find("## Node.js\n- Validate").unwrap();
        assert!(react < node);
    }

    #[tokio::test]
    async fn unknown_category_is_404() {
        let server = setup();
        let response = server.get("/api/guardrails/react?c=performance").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().starts_with("Unknown category(ies): performance\n"));
    }

    #[tokio::test]
    async fn unknown_technology_is_404() {
        let server = setup();
        let response = server.get("/api/guardrails/react,cobol").await;
        response.assert_status(StatusCode::NOT_FOUND);
        let text = response.text();
        assert!(text.starts_with("Unknown technology(ies): cobol\n"));
        assert!(text.contains("Available: node, react\n"));
    }

    #[tokio::test]
    async fn bare_path_returns_usage() {
        let server = setup();
        let response = server.get("/api/guardrails").await;
        response.assert_status_ok();
        let text = response.text();
        assert!(text.starts_with("Usage: curl -L ainit.dev/api/guardrails/"));
        assert!(text.contains("agents, cursor, claude, windsurf, copilot, gemini"));
    }

    #[tokio::test]
    async fn index_lists_categories_and_technologies() {
        let server = setup();
        let response = server.get("/api/guardrails-index").await;
        response.assert_status_ok();
        let index: GuardrailsIndex = response.json();
        assert_eq!(index.categories.len(), 3);
        assert_eq!(index.technologies.len(), 2);
    }
}

mod installer {
    use super::*;

    #[tokio::test]
    async fn without_selection_returns_usage() {
        let server = setup();
        let response = server.get("/api/init").await;
        response.assert_status_ok();
        assert!(response.text().starts_with("Usage: curl -sL"));
    }

    #[tokio::test]
    async fn sh_script_writes_both_files() {
        let server = setup();
        let response = server.get("/api/init?t=node?g=react?o=claude").await;

        response.assert_status_ok();
        let script = response.text();
        assert!(script.starts_with(
            "#!/bin/sh\n# curl -sL \"ainit.dev/api/init?t=node?g=react?o=claude?s=sh\" | sh\n"
        ));
        assert!(script.contains("cat > '.claudeignore' << 'AINIT_IGNORE_EOF'\n"));
        assert!(script.contains("cat > 'CLAUDE.md' << 'AINIT_RULES_EOF'\n"));
        assert!(script.contains("echo 'Created CLAUDE.md'\n"));
        assert!(script.find(".claudeignore").unwrap() < script.find("CLAUDE.md").unwrap());
    }

    #[tokio::test]
    async fn copilot_rules_create_the_github_directory() {
        let server = setup();
        let response = server.get("/api/init?g=react?o=copilot").await;

        response.assert_status_ok();
        let script = response.text();
        let mkdir = script.find("mkdir -p '.github'\n").unwrap();
        let cat = script
            .find("cat > '.github/copilot-instructions.md'")
            .unwrap();
        assert!(mkdir < cat);
        assert!(!script.contains(".aiexclude"));
    }

    #[tokio::test]
    async fn powershell_script() {
        let server = setup();
        let response = server.get("/api/init?t=python?s=ps").await;

        response.assert_status_ok();
        let script = response.text();
        assert!(script.starts_with("# iex (iwr \"ainit.dev/api/init?t=python?o=agents?s=ps\").Content\n"));
        assert!(script.contains("[IO.File]::WriteAllText((Join-Path $PWD '.aiignore'), '"));
        assert!(script.contains("Write-Host 'Created .aiignore'\n"));
    }

    #[tokio::test]
    async fn categories_only_apply_with_technologies() {
        let server = setup();
        let response = server.get("/api/init?t=python?c=security").await;
        response.assert_status_ok();
        assert!(!response.text().contains("c=security"));
    }

    #[tokio::test]
    async fn unknown_template_is_404() {
        let server = setup();
        let response = server.get("/api/init?t=python,nope").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().starts_with("Unknown template(s): nope\n"));
    }

    #[tokio::test]
    async fn encoded_separators_are_values_by_default() {
        let server = setup();
        let response = server.get("/api/init?t=python%3Fg%3Dreact").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn legacy_separators_decode_encoded_query() {
        let server = server_with(
            MemorySource::sample(),
            Settings {
                legacy_separators: true,
                ..settings()
            },
        );
        let response = server.get("/api/init?t=python%3Fg%3Dreact").await;
        response.assert_status_ok();
        let script = response.text();
        assert!(script.contains("cat > '.aiignore'"));
        assert!(script.contains("cat > 'AGENTS.md'"));
    }
}
