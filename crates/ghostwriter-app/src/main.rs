//! Ghostwriter binary - composition root.
//!
//! 1. Start tracing, then resolve configuration (CLI > env > TOML file > defaults)
//! 2. Open the SQLite context store
//! 3. Construct the configured embedding and completion providers; bad tags
//!    or missing credentials stop the process here
//! 4. Wire gateway -> assembler -> generator, and the Q/A archive
//! 5. Either serve the relay or draft replies for a single message

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use ghostwriter_chat::{PromptAssembler, ResponseGenerator};
use ghostwriter_core::{GhostwriterConfig, GhostwriterError, InboundMessage, Timestamp};
use ghostwriter_models::{ModelRegistry, ProviderSettings};
use ghostwriter_relay::{routes, AppState, QaArchive, RelayCoordinator, RelaySettings};
use ghostwriter_storage::{ContextGateway, ContextStore, Database, SqliteContextStore};

use cli::{CliArgs, Command};

/// Everything a generation needs, built once at startup.
struct Pipeline {
    generator: Arc<ResponseGenerator>,
    archive: Arc<QaArchive>,
}

fn build_pipeline(config: &GhostwriterConfig, db: Arc<Database>) -> Result<Pipeline, GhostwriterError> {
    let registry = ModelRegistry::with_defaults(ProviderSettings::from_config(config));
    let embedder = registry.create_embedding_model(&config.models.embedding)?;
    let completion = registry.create_completion_model(&config.models.completion)?;

    let store: Arc<dyn ContextStore> = Arc::new(SqliteContextStore::new(db));
    let gateway = ContextGateway::new(
        Arc::clone(&store),
        config.store.message_table.clone(),
        config.store.legacy_table.clone(),
    );
    let assembler = PromptAssembler::new(gateway, Arc::clone(&embedder), config.context.clone());

    Ok(Pipeline {
        generator: Arc::new(ResponseGenerator::new(assembler, completion)),
        archive: Arc::new(QaArchive::new(store, embedder)),
    })
}

/// Level for the subscriber: --log-level, then the config file, then info.
/// RUST_LOG still overrides whatever this returns.
fn initial_log_level(
    cli_level: Option<String>,
    loaded: &Result<GhostwriterConfig, GhostwriterError>,
) -> String {
    cli_level
        .or_else(|| loaded.as_ref().ok().map(|c| c.general.log_level.clone()))
        .unwrap_or_else(|| "info".to_string())
}

/// Settle the config read once the subscriber is up, so a broken file is
/// reported instead of silently replaced by defaults.
fn config_or_default(
    loaded: Result<GhostwriterConfig, GhostwriterError>,
    path: &Path,
) -> GhostwriterConfig {
    match loaded {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Configuration loaded");
            config
        }
        Err(GhostwriterError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No configuration file; using defaults");
            GhostwriterConfig::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Configuration unreadable; using defaults");
            GhostwriterConfig::default()
        }
    }
}

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

async fn serve(config: GhostwriterConfig, pipeline: Pipeline) -> Result<(), GhostwriterError> {
    let (relay, _coordinator) = RelayCoordinator::spawn(
        pipeline.generator,
        pipeline.archive,
        RelaySettings::from_config(&config),
    );
    let state = AppState::new(config.clone(), relay);

    tracing::info!(port = config.general.port, "Producer channel at /ws/messaging");
    tracing::info!(port = config.general.port, "Reviewer channel at /ws/frontend");

    routes::start_server(&config, state).await
}

async fn draft(
    pipeline: Pipeline,
    message: InboundMessage,
    as_json: bool,
) -> Result<(), GhostwriterError> {
    let candidates = pipeline.generator.generate(&message).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else {
        for (i, candidate) in candidates.as_slice().iter().enumerate() {
            println!("{}. {}", i + 1, candidate);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts but only reported after.
    let config_file = args.resolve_config_path();
    let loaded = GhostwriterConfig::load(&config_file);
    let log_level = initial_log_level(args.resolve_log_level(), &loaded);

    // Tracing. RUST_LOG wins over the resolved level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Ghostwriter v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config_or_default(loaded, &config_file);
    config.general.port = args.resolve_port(config.general.port);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    config.general.log_level = log_level;

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    let db_path = data_dir.join("ghostwriter.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Providers.
    let pipeline = match build_pipeline(&config, db) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            if e.is_fatal_at_startup() {
                tracing::error!(error = %e, "Provider configuration invalid");
            }
            return Err(e.into());
        }
    };
    tracing::info!(
        embedding = %config.models.embedding,
        completion = %config.models.completion,
        "Reply pipeline ready"
    );

    match args.command() {
        Command::Serve => serve(config, pipeline).await?,
        Command::Draft {
            content,
            sender,
            user,
            timestamp,
            json,
        } => {
            let message = InboundMessage {
                content,
                timestamp: timestamp.map(Timestamp).unwrap_or_else(Timestamp::now),
                sender_key: sender,
                user_id: user,
            };
            draft(pipeline, message, json).await?
        }
    }

    Ok(())
}
