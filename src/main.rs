use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vidsql::config::AppConfig;
use vidsql::db::{self, PgScalarStore};
use vidsql::execution::QueryExecutor;
use vidsql::pipeline::{build_primary, AnswerPipeline, GREETING};
use vidsql::primary::{NullGenerator, PrimaryGenerator};
use vidsql::Orchestrator;

#[derive(Parser)]
#[command(name = "vidsql")]
#[command(about = "Answers Russian analytics questions about videos with a single SQL query")]
struct Args {
    /// Skip the model-backed generator and use rule-based generation only
    #[arg(long, global = true)]
    no_llm: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one question and print the reply
    Ask { question: String },
    /// Answer one question per stdin line
    Repl,
    /// Print the query chosen for a question without running it
    Translate { question: String },
    /// Recreate the tables and load a JSON export
    Load {
        /// Path to the export (default: DATA_FILE)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Check storage connectivity and row counts
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    match args.command {
        Command::Translate { question } => {
            let primary = primary_for(&config, args.no_llm).await;
            let translation = Orchestrator::new(primary).translate(&question).await;
            match translation.accepted() {
                Some(query) => println!("[{}] {}", query.source, query.sql),
                None => println!("{}", vidsql::pipeline::GENERATION_FAILED_REPLY),
            }
            for attempt in &translation.attempts {
                info!(
                    "{} attempt accepted={} output={:?}",
                    attempt.source, attempt.accepted, attempt.output
                );
            }
        }
        Command::Ask { question } => {
            let pipeline = build_pipeline(&config, args.no_llm).await?;
            println!("{}", pipeline.answer(&question).await.reply_text());
        }
        Command::Repl => {
            let pipeline = build_pipeline(&config, args.no_llm).await?;
            println!("{}\n", GREETING);
            let mut stdout = tokio::io::stdout();
            pipeline
                .serve_lines(BufReader::new(tokio::io::stdin()), &mut stdout)
                .await?;
        }
        Command::Load { file } => {
            let pool = db::wait_for_storage(&config).await?;
            let path = file.unwrap_or_else(|| config.data_file.clone());
            let stats = db::load_json(&pool, &path).await?;
            println!("Loaded {} videos, {} snapshots", stats.videos, stats.snapshots);
        }
        Command::Check => {
            let pool = db::init_pool(&config.database).await?;
            let stats = db::storage_stats(&pool).await?;
            println!("Connected to {}", config.database.display_target());
            println!("Tables in database: {}", stats.public_tables);
            println!("videos: {}", count_text(stats.videos));
            println!("video_snapshots: {}", count_text(stats.video_snapshots));
        }
    }

    Ok(())
}

async fn primary_for(config: &AppConfig, no_llm: bool) -> Arc<dyn PrimaryGenerator> {
    if no_llm {
        return Arc::new(NullGenerator);
    }
    build_primary(&config.llm, false).await
}

async fn build_pipeline(config: &AppConfig, no_llm: bool) -> Result<AnswerPipeline> {
    let pool = db::wait_for_storage(config).await?;
    if db::ensure_data(&pool, config).await {
        info!("Dataset loaded");
    }
    match db::storage_stats(&pool).await {
        Ok(stats) => info!(
            "Storage ready: {} videos, {} snapshots",
            stats.videos.unwrap_or_default(),
            stats.video_snapshots.unwrap_or_default()
        ),
        Err(e) => warn!("Could not read storage stats: {}", e),
    }

    let primary = primary_for(config, no_llm).await;
    let store = Arc::new(PgScalarStore::new(pool));
    Ok(AnswerPipeline::new(
        Orchestrator::new(primary),
        QueryExecutor::new(store, config.query_timeout),
    ))
}

fn count_text(count: Option<i64>) -> String {
    match count {
        Some(n) => n.to_string(),
        None => "table not found".to_string(),
    }
}
