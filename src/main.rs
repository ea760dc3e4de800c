use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sysrev::{api, config::AppConfig, db::Database, models::ReviewDocument, tree_render};

#[derive(Parser)]
#[command(name = "sysrev")]
#[command(about = "Tag taxonomy and study tracking for systematic reviews")]
struct Cli {
    /// Database file (overrides SYSREV_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (overrides SYSREV_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List reviews
    Reviews,
    /// Write a review as a JSON document
    Export {
        /// Review id
        #[arg(short, long)]
        review: i64,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge a JSON document into a review
    Import {
        /// Review id
        #[arg(short, long)]
        review: i64,

        /// Document to import
        file: PathBuf,
    },
    /// Print the tag tree of a review
    Tree {
        /// Review id
        #[arg(short, long)]
        review: i64,
    },
}

/// Initialize tracing with output to stderr (for CLI output) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "sysrev=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Commands print their results on stdout
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

fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    let path = config.resolve_db_path()?;
    tracing::debug!("Using database {}", path.display());
    let db = Database::open(&path)?;
    db.migrate()?;
    Ok(db)
}

async fn serve(config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or_else(|| config.port());
    tracing::info!("Starting sysrev server on port {}", port);

    let db = open_database(&config)?;
    let app = api::create_router_with_config(db, &config);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("sysrev server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    let mut config = AppConfig::from_env();
    if cli.db.is_some() {
        config.db_path = cli.db;
    }

    match cli.command {
        Some(Commands::Serve { port }) => serve(config, port).await?,
        None => serve(config, None).await?,
        Some(Commands::Reviews) => {
            let db = open_database(&config)?;
            for review in db.list_reviews()? {
                println!(
                    "{:>4}  {:<12} {}",
                    review.id,
                    review.status.as_str(),
                    review.name
                );
            }
        }
        Some(Commands::Export { review, output }) => {
            let db = open_database(&config)?;
            let document = db.export_review(review)?;
            let json = serde_json::to_string_pretty(&document)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!("Exported review {} to {}", review, path.display());
                }
                None => println!("{}", json),
            }
        }
        Some(Commands::Import { review, file }) => {
            let db = open_database(&config)?;
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let document = ReviewDocument::from_json(&json)?;
            let summary = db.import_review(review, &document)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Some(Commands::Tree { review }) => {
            let db = open_database(&config)?;
            let forest = db.get_tag_forest(review)?;
            if forest.is_empty() {
                println!("(no tags)");
            } else {
                print!("{}", tree_render::render_tree(&forest));
            }
        }
    }

    Ok(())
}
