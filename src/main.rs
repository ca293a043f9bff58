use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ainit::api::{self, AppState};
use ainit::config::Settings;
use ainit::engine::{Engine, Policy};
use ainit::models::{ComposedDocument, Format, SelectionState, Shell};
use ainit::query::parse_slug_list;
use ainit::registry::{Catalog, FragmentSource, Namespace, Scope};
use ainit::render::{self, Rendered};

#[derive(Parser)]
#[command(name = "ainit")]
#[command(about = "Compose AI-tool ignore files and guardrail rules from shared templates")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where fragments come from. Flags override the environment.
#[derive(Args, Clone, Default)]
struct SourceArgs {
    /// Registry directory (templates/ and guardrails/)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Fetch the registry over HTTP from this origin
    #[arg(long)]
    upstream: Option<String>,

    /// Host echoed in generated commands
    #[arg(long)]
    public_host: Option<String>,

    /// Accept percent-encoded ?, = and & as query separators
    #[arg(long)]
    legacy_separators: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Compose an ignore file from templates
    Ignore {
        /// Comma-separated template slugs
        slugs: String,

        /// Target tool
        #[arg(short, long, value_enum, default_value_t = Format::Agents)]
        output: Format,

        /// Write to the tool's ignore file instead of stdout
        #[arg(short, long)]
        write: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Compose a guardrails rules file for technologies
    Rules {
        /// Comma-separated technology slugs
        technologies: String,

        /// Comma-separated categories to include (default: all)
        #[arg(short, long)]
        categories: Option<String>,

        /// Target tool
        #[arg(short, long, value_enum, default_value_t = Format::Agents)]
        output: Format,

        /// Write to the tool's rules file instead of stdout
        #[arg(short, long)]
        write: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print an installer script writing both files
    Init {
        /// Comma-separated template slugs
        #[arg(short, long, default_value = "")]
        templates: String,

        /// Comma-separated technology slugs
        #[arg(short, long, default_value = "")]
        guardrails: String,

        /// Comma-separated categories to include (default: all)
        #[arg(short, long)]
        categories: Option<String>,

        /// Target tool
        #[arg(short, long, value_enum, default_value_t = Format::Agents)]
        output: Format,

        /// Script dialect
        #[arg(short, long, value_enum, default_value_t = Shell::Sh)]
        shell: Shell,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Search templates (or guardrail technologies)
    Search {
        query: String,

        /// Search guardrail technologies instead of ignore templates
        #[arg(long)]
        guardrails: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// List supported tools and their files
    Formats,
}

/// Initialize tracing with output to stderr (for generation commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "ainit=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Generated files go to stdout, so logs must not
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn settings(args: &SourceArgs) -> Settings {
    let mut settings = Settings::from_env();
    if let Some(dir) = &args.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(url) = &args.upstream {
        settings.upstream_url = Some(url.clone());
    }
    if let Some(host) = &args.public_host {
        settings.public_host = host.clone();
    }
    if args.legacy_separators {
        settings.legacy_separators = true;
    }
    settings
}

fn categories(arg: Option<&str>) -> Option<Vec<String>> {
    arg.map(parse_slug_list).filter(|c| !c.is_empty())
}

async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting ainit server on port {}", port);

    let state = AppState::new(settings.source(), settings);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("ainit server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Print a composed document, or write it to its target file.
///
/// Placeholder documents are never written.
fn emit(doc: &ComposedDocument, write: bool) -> anyhow::Result<()> {
    if let Some(message) = &doc.placeholder {
        eprintln!("{}", message);
        if write {
            anyhow::bail!("Nothing to write to {}", doc.filename);
        }
        return Ok(());
    }

    let output = render::render_text(doc);
    if write {
        write_file(&output)
    } else {
        print!("{}", output.body);
        Ok(())
    }
}

fn write_file(output: &Rendered) -> anyhow::Result<()> {
    let path = Path::new(&output.filename);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, &output.body)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Created {}", output.filename);
    Ok(())
}

async fn client(settings: &Settings, scope: Scope) -> anyhow::Result<Engine> {
    let source: Arc<dyn FragmentSource> = settings.source();
    Engine::load(source, scope, settings.public_host.as_str(), Policy::Lenient)
        .await
        .context("Failed to load registry")
}

fn print_formats() {
    for format in Format::ALL {
        println!(
            "{:<10} {:<16} {:<34} {}",
            format.rules_slug(),
            format.ignore_file(),
            format.rules_file(),
            format.tool_name()
        );
        println!("{:<10} {}", "", format.setup_hint());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Everything except the server writes its product to stdout
    let use_stderr = !matches!(cli.command, Some(Commands::Serve { .. }) | None);
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve { port, host, source }) => {
            serve(&settings(&source), &host, port).await?;
        }
        Some(Commands::Ignore {
            slugs,
            output,
            write,
            source,
        }) => {
            let mut engine = client(&settings(&source), Scope::Templates).await?;
            let selection = SelectionState {
                templates: parse_slug_list(&slugs),
                format: output,
                ..Default::default()
            };
            let doc = engine.ignore_document(&selection).await?;
            emit(&doc, write)?;
        }
        Some(Commands::Rules {
            technologies,
            categories: subset,
            output,
            write,
            source,
        }) => {
            let mut engine = client(&settings(&source), Scope::Guardrails).await?;
            let selection = SelectionState {
                technologies: parse_slug_list(&technologies),
                categories: categories(subset.as_deref()),
                format: output,
                ..Default::default()
            };
            let doc = engine.rules_document(&selection).await?;
            emit(&doc, write)?;
        }
        Some(Commands::Init {
            templates,
            guardrails,
            categories: subset,
            output,
            shell,
            source,
        }) => {
            let selection = SelectionState {
                templates: parse_slug_list(&templates),
                technologies: parse_slug_list(&guardrails),
                categories: categories(subset.as_deref()),
                format: output,
                shell,
            };
            if selection.templates.is_empty() && selection.technologies.is_empty() {
                anyhow::bail!("Select at least one template (-t) or technology (-g)");
            }
            let mut engine = client(&settings(&source), Scope::All).await?;
            let script = engine.installer(&selection).await?;
            print!("{}", script.body);
        }
        Some(Commands::Search {
            query,
            guardrails,
            source,
        }) => {
            let settings = settings(&source);
            let (scope, namespace) = if guardrails {
                (Scope::Guardrails, Namespace::Technologies)
            } else {
                (Scope::Templates, Namespace::Templates)
            };
            let catalog = Catalog::load(settings.source().as_ref(), scope)
                .await
                .context("Failed to load registry")?;
            for entry in catalog.search(namespace, &query, &[]) {
                println!("{:<20} {}", entry.slug, entry.name);
            }
        }
        Some(Commands::Formats) => print_formats(),
        None => {
            // Default: start server
            serve(&Settings::from_env(), "127.0.0.1", 3000).await?;
        }
    }

    Ok(())
}
