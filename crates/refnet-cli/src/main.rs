mod discover;
mod session;

use clap::{Parser, Subcommand};
use refnet_discovery::SortKey;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "refnet-cli")]
#[command(about = "Referral network office discovery")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Search for offices near the clinic (or a ZIP code)
    Discover {
        /// User the search runs for
        #[arg(long)]
        user: Uuid,
        /// Search radius in whole miles
        #[arg(long)]
        distance: u32,
        /// Search around this ZIP code instead of the clinic
        #[arg(long)]
        zip: Option<String>,
        /// Provider office type filter (e.g. orthodontist)
        #[arg(long)]
        office_type: Option<String>,
        /// distance, rating, name or office_type
        #[arg(long, default_value = "distance")]
        sort: SortKey,
        /// Include offices already in the network
        #[arg(long)]
        show_added: bool,
    },
    /// Inspect or clear the persisted discovery session
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Add offices from the current session to the network
    Import {
        #[arg(long)]
        user: Uuid,
        /// Office ids as shown by `session show`
        #[arg(required = true)]
        office_ids: Vec<Uuid>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Run pending migrations
    Migrate,
    /// Delete cached candidates older than the retention window
    Prune {
        /// Overrides REFNET_CACHE_RETENTION_DAYS
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Debug, Subcommand)]
enum SessionCommands {
    Show {
        #[arg(long)]
        user: Uuid,
        #[arg(long, default_value = "distance")]
        sort: SortKey,
        #[arg(long)]
        show_added: bool,
    },
    Clear {
        #[arg(long)]
        user: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("refnet-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = refnet_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = refnet_db::PoolConfig::from_app_config(&config);
    let pool = refnet_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => run_db(&pool, &config, command).await?,
        Commands::Discover {
            user,
            distance,
            zip,
            office_type,
            sort,
            show_added,
        } => {
            let service = discover::build_service(&config, &pool)?;
            let params = refnet_core::DiscoveryParameters::new(distance, zip, office_type)?;
            discover::run_discover(&service, user, params, sort, show_added).await?;
        }
        Commands::Session { command } => {
            let service = discover::build_service(&config, &pool)?;
            match command {
                SessionCommands::Show {
                    user,
                    sort,
                    show_added,
                } => session::run_session_show(&service, user, sort, show_added).await,
                SessionCommands::Clear { user } => session::run_session_clear(&service, user).await,
            }
        }
        Commands::Import { user, office_ids } => {
            let service = discover::build_service(&config, &pool)?;
            session::run_import(&service, user, &office_ids).await?;
        }
    }

    Ok(())
}

async fn run_db(
    pool: &sqlx::PgPool,
    config: &refnet_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            refnet_db::ping(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = refnet_db::run_migrations(pool).await?;
            println!("migrations applied: {applied}");
        }
        DbCommands::Prune { days } => {
            let days = days.unwrap_or(config.cache_retention_days);
            let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
            let deleted = refnet_db::prune_discovered_offices(pool, cutoff).await?;
            tracing::info!(deleted, days, "discovery cache pruned");
            println!("pruned {deleted} cached offices older than {days} days");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
