mod commands;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "oppradar-cli")]
#[command(about = "Opportunity radar command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one ingest pass over all active, due sources.
    Ingest,
    /// Run one analysis batch over the unresolved-post backlog.
    Analyze {
        /// Batch size; defaults to the configured limit.
        #[arg(long)]
        limit: Option<i64>,
        /// Starting provider: "claude" or "openai".
        #[arg(long, default_value = "claude")]
        provider: String,
    },
    /// Print a pipeline and review-state snapshot.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = oppradar_core::load_app_config()?;
    let pool_config = oppradar_db::PoolConfig::from_app_config(&config);
    let pool = oppradar_db::connect_pool(&config.database_url, pool_config).await?;
    oppradar_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Ingest => commands::run_ingest(&pool, &config).await,
        Commands::Analyze { limit, provider } => {
            commands::run_analyze(&pool, &config, limit, &provider).await
        }
        Commands::Stats => commands::print_stats(&pool).await,
    }
}
