use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_forge::config::Config;
use course_forge::db::Database;
use course_forge::generation::StageGenerator;
use course_forge::llm::{GeminiService, GenerationService};
use course_forge::pipeline::{Pipeline, PipelineSettings};
use course_forge::suggest::SuggestionAdvisor;
use course_forge::{api, models::Stage};

#[derive(Parser)]
#[command(name = "cforge")]
#[command(about = "Course authoring backend with versioned, redoable generation stages")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// SQLite database file (overrides COURSE_FORGE_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Apply database migrations and exit
    Migrate {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print the version history of one entity's stage
    History {
        entity_id: uuid::Uuid,
        stage: String,

        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "course_forge=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(flag: Option<PathBuf>, config: &Config) -> anyhow::Result<Database> {
    let db = match flag.or_else(|| config.db_path.clone()) {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(port: u16, db: Database, config: Config) -> anyhow::Result<()> {
    let api_key = config
        .api_key
        .clone()
        .context("GEMINI_API_KEY (or GOOGLE_API_KEY) must be set to serve")?;
    let service: Arc<dyn GenerationService> = Arc::new(GeminiService::new(
        config.gemini_url.clone(),
        api_key,
        config.model.clone(),
        config.llm_timeout,
    )?);

    let pipeline = Pipeline::new(
        db,
        StageGenerator::new(service.clone()).with_temperature(config.temperature),
        SuggestionAdvisor::new(service),
        PipelineSettings {
            store_timeout: config.store_timeout,
            feedback_mode: config.feedback_mode,
            module_count: config.module_count,
        },
    );
    let app = api::create_router(pipeline, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(
        "course-forge listening on http://127.0.0.1:{} (model {})",
        port,
        config.model
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = Config::from_env()?;

    match cli.command {
        Some(Commands::Serve { port, db }) => {
            let db = open_database(db, &config)?;
            serve(port, db, config).await?;
        }
        Some(Commands::Migrate { db }) => {
            open_database(db, &config)?;
            tracing::info!("Database is up to date");
        }
        Some(Commands::History {
            entity_id,
            stage,
            db,
        }) => {
            let stage = Stage::from_str(&stage)
                .with_context(|| format!("Unknown stage: {stage}"))?;
            let db = open_database(db, &config)?;
            for version in db.history(entity_id, stage)? {
                println!(
                    "{}  {:<8}  {}  prev={}",
                    version.id,
                    version.kind.as_str(),
                    version.tag,
                    version
                        .previous_version_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        None => {
            let db = open_database(None, &config)?;
            serve(3000, db, config).await?;
        }
    }

    Ok(())
}
