//! docqa CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use docqa::{
    commands::{
        cmd_ask, cmd_delete, cmd_init, cmd_list, cmd_status, cmd_upload_path, print_answer,
        print_delete_stats, print_documents, print_init_stats, print_status, print_upload_stats,
        AskOptions,
    },
    config::Config,
    context::AppContext,
    error::{Error, Result},
    meta::MetaDb,
    progress::LogWriterFactory,
};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter, Layer, Registry};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(version, about = "Ask questions about your documents", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize docqa configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Upload a PDF, DOCX or TXT file, replacing the current document
    Upload {
        /// Path to the file
        path: PathBuf,

        /// Name to record instead of the file's own name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Ask a question about the uploaded document
    Ask {
        /// The question
        question: String,

        /// Only search this document
        #[arg(long)]
        file_id: Option<String>,

        /// Maximum number of context chunks
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum similarity (0-1)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Maximum tokens in the answer
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Delete a document (the current one if no id is given)
    Delete {
        /// Document id (use 'docqa list' to see ids)
        file_id: Option<String>,
    },

    /// List uploaded documents
    List,

    /// Show system status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let needs_config = !matches!(
        cli.command,
        Commands::Init { .. } | Commands::Completions { .. }
    );
    let config = needs_config.then(|| load_config(cli.config.as_deref()));

    init_logging(
        cli.verbose,
        config.as_ref().and_then(|c| c.as_ref().ok()),
    );

    let config = config.transpose()?;

    match (cli.command, config) {
        (Commands::Init { force }, _) => {
            let stats = cmd_init(Some(init_base_dir(cli.config)), force).await?;
            if cli.json {
                print_json(&stats)?;
            } else {
                print_init_stats(&stats);
            }
        }

        (Commands::Completions { shell }, _) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "docqa", &mut std::io::stdout());
        }

        (Commands::List, Some(config)) => {
            let db = MetaDb::connect(&config).await?;
            let documents = cmd_list(&db).await?;
            if cli.json {
                print_json(&documents)?;
            } else {
                print_documents(&documents);
            }
        }

        (Commands::Status, Some(config)) => {
            let db = MetaDb::connect(&config).await?;
            let status = cmd_status(&config, &db).await?;
            if cli.json {
                print_json(&status)?;
            } else {
                print_status(&status);
            }
        }

        (command, Some(config)) => {
            let ctx = AppContext::open(config).await?;
            run_document_command(&ctx, command, cli.json).await?;
        }

        (_, None) => {
            return Err(Error::Config("No configuration loaded".to_string()));
        }
    }

    Ok(())
}

async fn run_document_command(ctx: &AppContext, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Upload { path, name } => {
            let stats = cmd_upload_path(ctx, &path, name).await?;
            if json {
                print_json(&stats)?;
            } else {
                print_upload_stats(&stats);
            }
        }

        Commands::Ask {
            question,
            file_id,
            top_k,
            threshold,
            max_tokens,
        } => {
            let options = AskOptions {
                question,
                file_id,
                top_k,
                similarity_threshold: threshold,
                max_tokens,
            };
            let result = cmd_ask(ctx, options).await?;
            if json {
                print_json(&result)?;
            } else {
                print_answer(&result);
            }
        }

        Commands::Delete { file_id } => {
            let stats = cmd_delete(ctx, file_id.as_deref()).await?;
            if json {
                print_json(&stats)?;
            } else {
                print_delete_stats(&stats);
            }
        }

        Commands::Init { .. } | Commands::Completions { .. } | Commands::List | Commands::Status => {}
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `--config` may name the config file or the directory that holds it
fn init_base_dir(config: Option<PathBuf>) -> PathBuf {
    match config {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir),
        Some(path) => path,
        None => Config::default_base_dir(),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}. Run 'docqa init' first.",
            config_path.display()
        )));
    }

    Config::load(&config_path)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn init_logging(verbose: bool, config: Option<&Config>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let mut layers: Vec<BoxedLayer> = vec![fmt::layer()
        .with_writer(LogWriterFactory::default())
        .boxed()];

    let mut file_errors = Vec::new();
    if let Some(dir) = config.and_then(Config::log_dir) {
        let json = config.is_some_and(|c| c.logging.json);
        match file_layers(&dir, json) {
            Ok(file) => layers.extend(file),
            Err(e) => file_errors.push(format!("{}: {}", dir.display(), e)),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .init();

    for e in file_errors {
        warn!("File logging disabled, could not open log directory {}", e);
    }
}

/// `app.log` receives everything, `error.log` only errors
fn file_layers(dir: &Path, json: bool) -> std::io::Result<Vec<BoxedLayer>> {
    std::fs::create_dir_all(dir)?;
    let app = open_log(&dir.join("app.log"))?;
    let errors = open_log(&dir.join("error.log"))?;

    let layers = if json {
        vec![
            fmt::layer().json().with_writer(Mutex::new(app)).boxed(),
            fmt::layer()
                .json()
                .with_writer(Mutex::new(errors))
                .with_filter(LevelFilter::ERROR)
                .boxed(),
        ]
    } else {
        vec![
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(app))
                .boxed(),
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(errors))
                .with_filter(LevelFilter::ERROR)
                .boxed(),
        ]
    };
    Ok(layers)
}

fn open_log(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
